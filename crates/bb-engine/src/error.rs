//! Engine error type.

use bb_ir::{ConfigError, PlayError};

use crate::backend::BackendError;

/// Any failure surfaced by an engine operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Play(#[from] PlayError),
    #[error("audio backend: {0}")]
    Backend(#[from] BackendError),
}
