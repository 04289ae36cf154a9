//! Device output for the backbeat rhythm core.

mod cpal_backend;
mod error;
mod link;

pub use cpal_backend::CpalLayerOutput;
pub use error::AudioError;
pub use link::{link, AudioRenderer, DeviceBackend, DeviceClock, COMMAND_CAPACITY};
