//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the `fedquery` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// A dataset or request file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataset or request file is not valid JSON for its shape.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The federation rejected the dataset or the request.
    #[error(transparent)]
    Federation(#[from] fedquery_core::Error),

    /// The response could not be written.
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
