//! Session error type.

use bb_audio::AudioError;
use bb_chart::ChartError;
use bb_engine::EngineError;
use bb_ir::{ConfigError, PlayError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Play(#[from] PlayError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("audio output: {0}")]
    Audio(#[from] AudioError),
    #[error("writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
