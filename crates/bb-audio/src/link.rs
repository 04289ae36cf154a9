//! The bridge between the tick loop and the audio thread.
//!
//! The tick side turns backend calls into frame-timed `MixerCommand`s and
//! pushes them through a single-producer/single-consumer ring buffer. The
//! audio side drains that buffer at the top of every callback, renders the
//! mixer, publishes its frame counter and reports layers whose clips ran
//! out through a second ring buffer. Neither side blocks or locks.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bb_engine::{AudioBackend, BackendError, ClockSource, LayerMixer, MixerCommand};
use bb_ir::{ClipBank, ClipKey, DspTime, LayerRef};
use log::debug;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use slotmap::SecondaryMap;

/// Command ring capacity.
pub const COMMAND_CAPACITY: usize = 256;

/// The audio clock as published by the audio thread.
#[derive(Clone, Debug)]
pub struct DeviceClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl DeviceClock {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl ClockSource for DeviceClock {
    fn now(&self) -> DspTime {
        DspTime::from_frames(self.frames(), self.sample_rate)
    }
}

/// Audio-thread half: owns the mixer.
pub struct AudioRenderer {
    mixer: LayerMixer,
    commands: HeapCons<MixerCommand>,
    finished: HeapProd<LayerRef>,
    frames: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl AudioRenderer {
    /// Apply queued commands, then fill `out` with interleaved samples.
    ///
    /// The first two channels carry left and right; any others are zeroed.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        while let Some(command) = self.commands.try_pop() {
            if self.mixer.apply(command).is_err() {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }

        for chunk in out.chunks_mut(channels.max(1)) {
            let frame = self.mixer.render_frame();
            for (i, sample) in chunk.iter_mut().enumerate() {
                *sample = match i {
                    0 => frame.left,
                    1 => frame.right,
                    _ => 0.0,
                };
            }
        }

        while let Some(layer) = self.mixer.pop_finished() {
            let _ = self.finished.try_push(layer);
        }
        self.frames.store(self.mixer.frame(), Ordering::Release);
    }

    /// Render silence without advancing the mixer.
    pub fn silence(out: &mut [f32]) {
        out.fill(0.0);
    }
}

/// Tick-side half: an `AudioBackend` that forwards to the audio thread.
pub struct DeviceBackend {
    commands: HeapProd<MixerCommand>,
    finished: HeapCons<LayerRef>,
    clock: DeviceClock,
    durations: SecondaryMap<ClipKey, f64>,
    playing: BTreeSet<LayerRef>,
    rejected: Arc<AtomicU64>,
}

impl DeviceBackend {
    pub fn clock(&self) -> &DeviceClock {
        &self.clock
    }

    /// Commands the audio thread could not apply.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn frame_for(&self, at: Option<DspTime>) -> u64 {
        let now = self.clock.frames();
        at.map_or(now, |t| t.to_frames_ceil(self.clock.sample_rate).max(now))
    }

    fn send(&mut self, command: MixerCommand) -> Result<(), BackendError> {
        self.commands.try_push(command).map_err(|_| BackendError::QueueFull)
    }
}

impl ClockSource for DeviceBackend {
    fn now(&self) -> DspTime {
        self.clock.now()
    }
}

impl AudioBackend for DeviceBackend {
    fn start(
        &mut self,
        layer: LayerRef,
        clip: ClipKey,
        volume: f32,
        looping: bool,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        if !self.durations.contains_key(clip) {
            return Err(BackendError::UnknownClip);
        }
        let at = self.frame_for(at);
        self.send(MixerCommand::Start { layer, clip, gain: volume, looping, at })?;
        self.playing.insert(layer);
        Ok(())
    }

    fn stop(&mut self, layer: LayerRef, at: Option<DspTime>) -> Result<(), BackendError> {
        let at = self.frame_for(at);
        self.send(MixerCommand::Stop { layer, at })?;
        self.playing.remove(&layer);
        Ok(())
    }

    fn ramp(
        &mut self,
        layer: LayerRef,
        target: f32,
        duration: f64,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        let at = self.frame_for(at);
        let frames = (duration.max(0.0) * self.clock.sample_rate as f64).round() as u64;
        self.send(MixerCommand::Ramp { layer, target, frames, at })
    }

    fn is_playing(&self, layer: LayerRef) -> bool {
        self.playing.contains(&layer)
    }

    fn clip_duration(&self, clip: ClipKey) -> Option<f64> {
        self.durations.get(clip).copied()
    }

    fn poll(&mut self) {
        while let Some(layer) = self.finished.try_pop() {
            debug!("audio thread reports {:?} finished", layer);
            self.playing.remove(&layer);
        }
    }
}

/// Split a mixer over `bank` into its tick-side and audio-side halves.
pub fn link(bank: ClipBank, sample_rate: u32) -> (DeviceBackend, AudioRenderer) {
    let durations = bank.iter().map(|(key, clip)| (key, clip.duration())).collect();

    let (command_tx, command_rx) = HeapRb::<MixerCommand>::new(COMMAND_CAPACITY).split();
    let (finished_tx, finished_rx) = HeapRb::<LayerRef>::new(bb_engine::MAX_VOICES).split();
    let frames = Arc::new(AtomicU64::new(0));
    let rejected = Arc::new(AtomicU64::new(0));

    let backend = DeviceBackend {
        commands: command_tx,
        finished: finished_rx,
        clock: DeviceClock { frames: frames.clone(), sample_rate },
        durations,
        playing: BTreeSet::new(),
        rejected: rejected.clone(),
    };
    let renderer = AudioRenderer {
        mixer: LayerMixer::new(bank, sample_rate),
        commands: command_rx,
        finished: finished_tx,
        frames,
        rejected,
    };
    (backend, renderer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_ir::Clip;

    fn setup() -> (DeviceBackend, AudioRenderer, ClipKey) {
        let mut bank = ClipBank::new();
        let key = bank.insert(Clip::new("ones", 100, vec![1.0; 10]));
        let (backend, renderer) = link(bank, 100);
        (backend, renderer, key)
    }

    const L0: LayerRef = LayerRef::new(0, 0);

    #[test]
    fn commands_cross_to_the_audio_thread() {
        let (mut backend, mut renderer, key) = setup();
        backend.start(L0, key, 0.5, false, Some(DspTime::from_secs(0.02))).unwrap();
        assert!(backend.is_playing(L0));

        let mut out = vec![0.0; 8];
        renderer.render_interleaved(&mut out, 2);
        assert_eq!(out, [0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(backend.now(), DspTime::from_frames(4, 100));
    }

    #[test]
    fn finished_layers_are_reported_back() {
        let (mut backend, mut renderer, key) = setup();
        backend.start(L0, key, 1.0, false, None).unwrap();

        let mut out = vec![0.0; 32];
        renderer.render_interleaved(&mut out, 2);
        assert!(backend.is_playing(L0));
        backend.poll();
        assert!(!backend.is_playing(L0));
        assert_eq!(backend.clip_duration(key), Some(0.1));
    }

    #[test]
    fn unknown_clip_is_refused_on_the_tick_side() {
        let (mut backend, _renderer, _) = setup();
        assert_eq!(
            backend.start(L0, ClipKey::default(), 1.0, false, None),
            Err(BackendError::UnknownClip)
        );
    }

    #[test]
    fn full_ring_reports_queue_full() {
        let (mut backend, _renderer, _) = setup();
        for _ in 0..COMMAND_CAPACITY {
            backend.stop(L0, None).unwrap();
        }
        assert_eq!(backend.stop(L0, None), Err(BackendError::QueueFull));
    }

    #[test]
    fn extra_channels_are_silent() {
        let (mut backend, mut renderer, key) = setup();
        backend.start(L0, key, 1.0, true, None).unwrap();
        let mut out = vec![9.0; 8];
        renderer.render_interleaved(&mut out, 4);
        assert_eq!(out, [1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
