//! Real-time playback through the default output device.

use std::time::Duration;

use bb_audio::CpalLayerOutput;
use bb_chart::LoadedSequence;
use bb_ir::ClipBank;
use log::info;

use crate::autoplay::Autoplay;
use crate::config::SessionConfig;
use crate::{Session, SessionError};

#[derive(Clone, Debug, PartialEq)]
pub struct LiveOptions {
    pub max_seconds: f64,
    /// Sleep between ticks
    pub tick_interval: Duration,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self { max_seconds: 300.0, tick_interval: Duration::from_millis(5) }
    }
}

/// Open the default device and build a session around it.
pub fn live_session(
    bank: ClipBank,
    loaded: LoadedSequence,
    config: SessionConfig,
) -> Result<Session<CpalLayerOutput>, SessionError> {
    let output = CpalLayerOutput::new(bank)?;
    Session::new(output, loaded, config)
}

/// Play `session` in real time until the sequence finishes or the time
/// limit passes. Blocks the calling thread.
pub fn run_live(
    session: &mut Session<CpalLayerOutput>,
    options: &LiveOptions,
    mut autoplay: Option<&mut Autoplay>,
) -> Result<(), SessionError> {
    session.backend_mut().play()?;
    session.start()?;
    info!("playing at {} Hz", session.backend().sample_rate());

    while session.now().as_secs() < options.max_seconds {
        session.tick();
        if let Some(autoplay) = autoplay.as_deref_mut() {
            autoplay.drive(session);
        }
        if session.is_finished() {
            break;
        }
        std::thread::sleep(options.tick_interval);
    }

    // Let the stop commands reach the audio thread
    std::thread::sleep(Duration::from_secs_f64(session.scheduler().lookahead()));
    session.backend_mut().pause()?;
    Ok(())
}
