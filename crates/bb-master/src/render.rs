//! Offline rendering.
//!
//! Runs a session against the software mixer, which doubles as the clock:
//! every block of rendered frames moves time forward by exactly that many
//! frames.

use bb_chart::LoadedSequence;
use bb_engine::{Frame, LayerMixer};
use bb_ir::ClipBank;
use log::info;

use crate::autoplay::Autoplay;
use crate::config::SessionConfig;
use crate::score::Scoreboard;
use crate::wav::frames_to_wav;
use crate::{Session, SessionError};

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub sample_rate: u32,
    /// Frames rendered per tick
    pub block_frames: usize,
    /// Stop after this long even if the sequence is still playing
    pub max_seconds: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { sample_rate: 44100, block_frames: 256, max_seconds: 300.0 }
    }
}

#[derive(Clone, Debug)]
pub struct RenderOutput {
    pub frames: Vec<Frame>,
    pub sample_rate: u32,
    pub scoreboard: Scoreboard,
    /// Whether the sequence ran to its end before the time limit
    pub finished: bool,
}

impl RenderOutput {
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }

    pub fn to_wav(&self) -> Vec<u8> {
        frames_to_wav(&self.frames, self.sample_rate)
    }
}

/// Build a session whose backend is a software mixer over `bank`.
pub fn offline_session(
    bank: ClipBank,
    loaded: LoadedSequence,
    config: SessionConfig,
    sample_rate: u32,
) -> Result<Session<LayerMixer>, SessionError> {
    Session::new(LayerMixer::new(bank, sample_rate), loaded, config)
}

/// Start `session` and render until the sequence finishes and its last
/// voice falls silent, or until the time limit.
pub fn render(
    session: &mut Session<LayerMixer>,
    options: &RenderOptions,
    mut autoplay: Option<&mut Autoplay>,
) -> Result<RenderOutput, SessionError> {
    let sample_rate = session.backend().sample_rate();
    let max_frames = (options.max_seconds.max(0.0) * sample_rate as f64).ceil() as usize;
    let mut frames = Vec::with_capacity(max_frames.min(sample_rate as usize * 60));
    let mut block = vec![Frame::silence(); options.block_frames.max(1)];

    session.start()?;
    while frames.len() < max_frames {
        session.tick();
        if let Some(autoplay) = autoplay.as_deref_mut() {
            autoplay.drive(session);
        }
        if session.is_finished() && session.backend().active_voices() == 0 {
            break;
        }
        let n = block.len().min(max_frames - frames.len());
        render_block(session.backend_mut(), &mut block[..n]);
        frames.extend_from_slice(&block[..n]);
    }

    let output = RenderOutput {
        frames,
        sample_rate,
        scoreboard: session.scoreboard().clone(),
        finished: session.is_finished(),
    };
    info!("rendered {:.2}s: {}", output.duration(), output.scoreboard);
    Ok(output)
}

fn render_block(mixer: &mut LayerMixer, out: &mut [Frame]) {
    #[cfg(feature = "alloc_check")]
    assert_no_alloc::assert_no_alloc(|| mixer.render(out));
    #[cfg(not(feature = "alloc_check"))]
    mixer.render(out);
}
