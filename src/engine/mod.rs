//! Engine Process + Engine Pool: owning and scheduling UCI subprocesses.

pub mod options;
pub mod pool;
pub mod process;
pub mod uci;

pub use pool::{EnginePool, PoolStats};
pub use process::{
    engine_binary_path, EngineError, EngineProcess, RawCandidate, SearchLimits, SearchPosition,
    SearchRequest,
};
