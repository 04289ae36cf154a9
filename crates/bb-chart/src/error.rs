//! Load-time error type.

use bb_ir::ConfigError;

/// Why a sequence document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("clip '{name}': {reason}")]
    Wav { name: String, reason: &'static str },
}
