//! Software layer mixer.
//!
//! Plays clips for layers with frame-accurate starts, stops and ramps. The
//! render path works on a fixed-capacity voice table and never allocates,
//! so the mixer can run on a real-time audio thread. Its own frame counter
//! doubles as the audio clock.

use bb_ir::{ClipBank, ClipKey, DspTime, LayerRef};
use heapless::Vec as FixedVec;

use crate::backend::{AudioBackend, BackendError};
use crate::clock::ClockSource;
use crate::frame::Frame;
use crate::voice::Voice;

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 32;

/// A command for the mixer, timed in absolute output frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MixerCommand {
    Start { layer: LayerRef, clip: ClipKey, gain: f32, looping: bool, at: u64 },
    Stop { layer: LayerRef, at: u64 },
    Ramp { layer: LayerRef, target: f32, frames: u64, at: u64 },
}

/// Mixes the voices of every playing layer into stereo frames.
#[derive(Debug)]
pub struct LayerMixer {
    bank: ClipBank,
    voices: FixedVec<Voice, MAX_VOICES>,
    finished: FixedVec<LayerRef, MAX_VOICES>,
    sample_rate: u32,
    /// Next frame to render
    frame: u64,
    master_gain: f32,
}

impl LayerMixer {
    pub fn new(bank: ClipBank, sample_rate: u32) -> Self {
        Self {
            bank,
            voices: FixedVec::new(),
            finished: FixedVec::new(),
            sample_rate,
            frame: 0,
            master_gain: 1.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn bank(&self) -> &ClipBank {
        &self.bank
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Convert an optional instant to a frame no earlier than the next one.
    pub fn frame_for(&self, at: Option<DspTime>) -> u64 {
        at.map_or(self.frame, |t| t.to_frames_ceil(self.sample_rate).max(self.frame))
    }

    /// Seconds to frames, rounded to the nearest frame.
    pub fn frames_for(&self, secs: f64) -> u64 {
        libm::round(secs.max(0.0) * self.sample_rate as f64) as u64
    }

    /// Apply a command. Does not allocate.
    pub fn apply(&mut self, command: MixerCommand) -> Result<(), BackendError> {
        match command {
            MixerCommand::Start { layer, clip, gain, looping, at } => {
                let clip_rate = self.bank.get(clip).ok_or(BackendError::UnknownClip)?.sample_rate;
                let mut voice = Voice::new(layer, clip, gain, looping, at.max(self.frame));
                if self.sample_rate > 0 {
                    voice.increment = clip_rate as f64 / self.sample_rate as f64;
                }
                self.voices.push(voice).map_err(|_| BackendError::VoicesExhausted(layer))
            }
            MixerCommand::Stop { layer, at } => {
                let at = at.max(self.frame);
                for voice in self.voices.iter_mut().filter(|v| v.layer == layer) {
                    voice.stop_at(at);
                }
                Ok(())
            }
            MixerCommand::Ramp { layer, target, frames, at } => {
                let now = self.frame;
                for voice in self.voices.iter_mut().filter(|v| v.layer == layer && !v.is_finished()) {
                    voice.ramp_to(target, at.max(now), frames, now);
                }
                Ok(())
            }
        }
    }

    /// Render and return one frame.
    pub fn render_frame(&mut self) -> Frame {
        let frame = self.frame;
        let mut sum = 0.0;
        for voice in self.voices.iter_mut() {
            if let Some(clip) = self.bank.get(voice.clip) {
                sum += voice.render(clip, frame);
            }
        }
        self.frame += 1;
        self.reap();

        let mut out = Frame::mono(sum);
        out.apply_gain(self.master_gain);
        out
    }

    /// Fill `out` with rendered frames.
    pub fn render(&mut self, out: &mut [Frame]) {
        for slot in out.iter_mut() {
            *slot = self.render_frame();
        }
    }

    /// Drop finished voices, remembering which layers ended.
    fn reap(&mut self) {
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].is_finished() {
                let voice = self.voices.swap_remove(i);
                if !self.voices.iter().any(|v| v.layer == voice.layer) {
                    let _ = self.finished.push(voice.layer);
                }
            } else {
                i += 1;
            }
        }
    }

    /// Take the next layer whose last voice ended.
    pub fn pop_finished(&mut self) -> Option<LayerRef> {
        self.finished.pop()
    }
}

impl ClockSource for LayerMixer {
    fn now(&self) -> DspTime {
        DspTime::from_frames(self.frame, self.sample_rate)
    }
}

impl AudioBackend for LayerMixer {
    fn start(
        &mut self,
        layer: LayerRef,
        clip: ClipKey,
        volume: f32,
        looping: bool,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        let at = self.frame_for(at);
        self.apply(MixerCommand::Start { layer, clip, gain: volume, looping, at })
    }

    fn stop(&mut self, layer: LayerRef, at: Option<DspTime>) -> Result<(), BackendError> {
        let at = self.frame_for(at);
        self.apply(MixerCommand::Stop { layer, at })
    }

    fn ramp(
        &mut self,
        layer: LayerRef,
        target: f32,
        duration: f64,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        let at = self.frame_for(at);
        let frames = self.frames_for(duration);
        self.apply(MixerCommand::Ramp { layer, target, frames, at })
    }

    fn is_playing(&self, layer: LayerRef) -> bool {
        self.voices.iter().any(|v| v.layer == layer && !v.is_finished())
    }

    fn clip_duration(&self, clip: ClipKey) -> Option<f64> {
        self.bank.duration(clip)
    }

    fn poll(&mut self) {
        self.finished.clear();
    }
}
