//! Gateway-level error kinds (§7). Engine-level failures live in
//! [`crate::engine::EngineError`] and are mapped to the `*_error` frame
//! wording by the handlers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not authenticated")]
    Unauthenticated,
    #[error("UCI protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("client write failed, connection likely gone")]
    Transient,
}

impl From<crate::engine::EngineError> for GatewayError {
    fn from(e: crate::engine::EngineError) -> Self {
        Self::ProtocolViolation(e.to_string())
    }
}
