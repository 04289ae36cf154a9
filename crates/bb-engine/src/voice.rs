//! Voice: one playing layer inside the mixer.
//!
//! All times are absolute frame numbers on the mixer's output clock, so
//! starts, stops and ramps land on exact frames no matter when the command
//! arrived.

use bb_ir::{Clip, ClipKey, LayerRef};

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Waiting for its start frame.
    #[default]
    Pending,
    /// Producing audio.
    Playing,
    /// Reached its stop frame or the end of a non-looping clip.
    Finished,
}

/// A linear gain change in frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainRamp {
    pub start: u64,
    pub frames: u64,
    /// Gain at `start`; captured when the ramp begins
    pub from: Option<f32>,
    pub to: f32,
}

/// A single voice producing audio from a clip.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Which layer this voice belongs to.
    pub layer: LayerRef,
    /// Which clip it plays.
    pub clip: ClipKey,
    /// Read position in clip frames.
    pub position: f64,
    /// Clip frames per output frame.
    pub increment: f64,
    pub looping: bool,
    /// Current gain (0.0-1.0).
    pub gain: f32,
    pub start_frame: u64,
    pub stop_frame: Option<u64>,
    pub ramp: Option<GainRamp>,
    pub state: VoiceState,
}

impl Voice {
    pub fn new(layer: LayerRef, clip: ClipKey, gain: f32, looping: bool, start_frame: u64) -> Self {
        Self {
            layer,
            clip,
            position: 0.0,
            increment: 1.0,
            looping,
            gain,
            start_frame,
            stop_frame: None,
            ramp: None,
            state: VoiceState::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == VoiceState::Finished
    }

    /// Stop at `frame`, keeping an earlier stop if one is set.
    pub fn stop_at(&mut self, frame: u64) {
        self.stop_frame = Some(self.stop_frame.map_or(frame, |f| f.min(frame)));
    }

    /// Ramp to `to` over `frames`, starting at `start`. A ramp already in
    /// progress is frozen at its current gain first.
    pub fn ramp_to(&mut self, to: f32, start: u64, frames: u64, now: u64) {
        if let Some(ramp) = self.ramp {
            if ramp.start <= now {
                self.gain = ramp_gain(&ramp, self.gain, now);
            }
        }
        self.ramp = Some(GainRamp { start, frames, from: None, to });
    }

    /// Produce the sample for output frame `frame` and advance.
    pub fn render(&mut self, clip: &Clip, frame: u64) -> f32 {
        if self.state == VoiceState::Finished {
            return 0.0;
        }
        if self.stop_frame.is_some_and(|stop| frame >= stop) {
            self.state = VoiceState::Finished;
            return 0.0;
        }
        if frame < self.start_frame {
            return 0.0;
        }
        self.state = VoiceState::Playing;

        if let Some(ramp) = self.ramp.as_mut() {
            if frame >= ramp.start {
                let from = *ramp.from.get_or_insert(self.gain);
                let done = frame - ramp.start;
                if done >= ramp.frames {
                    self.gain = ramp.to;
                    self.ramp = None;
                } else {
                    let t = done as f32 / ramp.frames as f32;
                    self.gain = from + (ramp.to - from) * t;
                }
            }
        }

        let index = self.position as usize;
        let Some(&sample) = clip.data.get(index) else {
            self.state = VoiceState::Finished;
            return 0.0;
        };
        self.position += self.increment;
        if self.position as usize >= clip.data.len() {
            if self.looping {
                self.position -= clip.data.len() as f64;
            } else {
                self.state = VoiceState::Finished;
            }
        }
        sample * self.gain
    }
}

fn ramp_gain(ramp: &GainRamp, current: f32, frame: u64) -> f32 {
    let from = ramp.from.unwrap_or(current);
    let done = frame.saturating_sub(ramp.start);
    if ramp.frames == 0 || done >= ramp.frames {
        ramp.to
    } else {
        from + (ramp.to - from) * (done as f32 / ramp.frames as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use bb_ir::ClipBank;

    fn clip(len: usize) -> (ClipBank, ClipKey) {
        let mut bank = ClipBank::new();
        let key = bank.insert(Clip::new("ones", 100, vec![1.0; len]));
        (bank, key)
    }

    fn render(voice: &mut Voice, bank: &ClipBank, frames: core::ops::Range<u64>) -> Vec<f32> {
        let clip = bank.get(voice.clip).unwrap();
        frames.map(|f| voice.render(clip, f)).collect()
    }

    #[test]
    fn starts_on_its_frame_and_ends_with_clip() {
        let (bank, key) = clip(3);
        let mut voice = Voice::new(LayerRef::new(0, 0), key, 0.5, false, 2);
        assert_eq!(render(&mut voice, &bank, 0..7), [0.0, 0.0, 0.5, 0.5, 0.5, 0.0, 0.0]);
        assert!(voice.is_finished());
    }

    #[test]
    fn looping_wraps() {
        let (bank, key) = clip(2);
        let mut voice = Voice::new(LayerRef::new(0, 0), key, 1.0, true, 0);
        assert_eq!(render(&mut voice, &bank, 0..5), [1.0; 5]);
        assert!(!voice.is_finished());
    }

    #[test]
    fn stop_frame_is_exact() {
        let (bank, key) = clip(100);
        let mut voice = Voice::new(LayerRef::new(0, 0), key, 1.0, false, 0);
        voice.stop_at(3);
        voice.stop_at(10);
        assert_eq!(render(&mut voice, &bank, 0..5), [1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn ramp_is_linear_from_captured_gain() {
        let (bank, key) = clip(100);
        let mut voice = Voice::new(LayerRef::new(0, 0), key, 0.0, false, 0);
        voice.ramp_to(1.0, 2, 4, 0);
        let out = render(&mut voice, &bank, 0..8);
        assert_eq!(out, [0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    }
}
