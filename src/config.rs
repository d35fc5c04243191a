//! Process/OS configuration surface (§6): bind address, pool sizes, engine
//! binary directory — CLI flags with environment-variable fallback, matching
//! the teacher's env-first convention (`AppConfig::from_env`) but using
//! `clap`'s `env` feature instead of hand-rolled `std::env::var` lookups.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "engine-gateway")]
#[command(about = "WebSocket gateway dispatching move suggestion and analysis requests to UCI engine pools")]
#[command(version)]
pub struct AppConfig {
    /// HTTP/WebSocket bind address.
    #[arg(long, env = "ENGINE_GATEWAY_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Number of engine processes dedicated to move suggestions.
    #[arg(long, env = "SUGGESTION_POOL_SIZE", default_value_t = 4)]
    pub suggestion_pool_size: usize,

    /// Number of engine processes dedicated to move analysis.
    #[arg(long, env = "ANALYSIS_POOL_SIZE", default_value_t = 2)]
    pub analysis_pool_size: usize,

    /// Directory containing the UCI engine binaries.
    #[arg(long = "engine-dir", env = "ENGINE_BINARY_DIR", default_value = "./engines")]
    pub engine_binary_dir: PathBuf,
}
