//! Suggestion and Analysis handlers: validate input, build the work item's
//! `process` closure, enqueue it.

pub mod analysis;
pub mod suggestion;

pub use analysis::{AnalysisArtifact, AnalysisHandler};
pub use suggestion::{SuggestionArtifact, SuggestionHandler};
