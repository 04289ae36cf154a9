//! Session composition root for the backbeat rhythm core.
//!
//! Wires a clock/backend pair to the scheduler, sequencer, volume
//! controller and note timeline, routes their signals to subscribers, and
//! provides offline rendering and live device playback on top.

mod autoplay;
mod combo;
mod config;
pub mod demo;
mod error;
mod live;
mod render;
mod router;
mod score;
mod session;
mod wav;

// Re-export common types so callers don't need the lower crates directly.
pub use bb_chart::{load_sequence_file, LoadedSequence};
pub use bb_engine::{Frame, Granularity, Judgment, VolumeRequest};
pub use bb_ir::{ClipBank, Signal, SignalKind};

pub use autoplay::Autoplay;
pub use combo::{ComboChange, ComboLayering};
pub use config::{ComboLayeringConfig, SessionConfig};
pub use error::SessionError;
pub use live::{live_session, run_live, LiveOptions};
pub use render::{offline_session, render, RenderOptions, RenderOutput};
pub use router::{SignalRouter, SignalSink, SubscriberId};
pub use score::Scoreboard;
pub use session::Session;
pub use wav::{frames_to_wav, write_wav};
