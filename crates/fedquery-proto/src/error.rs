//! Protocol error types.

use thiserror::Error;

/// Errors raised while building or decoding contract types.
#[derive(Debug, Error)]
pub enum Error {
    /// A record was not a JSON object.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// An operator received an operand it cannot use.
    #[error("invalid operand for {operator}: {reason}")]
    InvalidOperand {
        operator: &'static str,
        reason: String,
    },

    /// JSON decoding failed.
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}
