//! The audio backend seam.
//!
//! The scheduler realizes layer events against an `AudioBackend`. A backend
//! either applies a command right away (`at == None`) or commits it to its
//! own sample-accurate future scheduling at `at`.

use bb_ir::{ClipKey, DspTime, LayerRef};

/// Failure reported by an audio backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("clip is not loaded in the backend")]
    UnknownClip,
    #[error("no free voice for layer {0:?}")]
    VoicesExhausted(LayerRef),
    #[error("command queue to the audio thread is full")]
    QueueFull,
}

/// Playback primitives the layer scheduler needs.
pub trait AudioBackend {
    /// Start `clip` for `layer` at `volume`, now or at `at`.
    fn start(
        &mut self,
        layer: LayerRef,
        clip: ClipKey,
        volume: f32,
        looping: bool,
        at: Option<DspTime>,
    ) -> Result<(), BackendError>;

    /// Stop `layer` without fading, now or at `at`.
    fn stop(&mut self, layer: LayerRef, at: Option<DspTime>) -> Result<(), BackendError>;

    /// Ramp `layer` linearly to `target` over `duration` seconds, beginning
    /// now or at `at`.
    fn ramp(
        &mut self,
        layer: LayerRef,
        target: f32,
        duration: f64,
        at: Option<DspTime>,
    ) -> Result<(), BackendError>;

    /// Whether `layer` is playing or waiting to start.
    fn is_playing(&self, layer: LayerRef) -> bool;

    /// Length of a clip in seconds, when the backend knows it.
    fn clip_duration(&self, clip: ClipKey) -> Option<f64>;

    /// Collect state changes reported by the audio side. Called once per
    /// tick before completion is evaluated.
    fn poll(&mut self) {}
}

impl<B: AudioBackend + ?Sized> AudioBackend for &mut B {
    fn start(
        &mut self,
        layer: LayerRef,
        clip: ClipKey,
        volume: f32,
        looping: bool,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        (**self).start(layer, clip, volume, looping, at)
    }

    fn stop(&mut self, layer: LayerRef, at: Option<DspTime>) -> Result<(), BackendError> {
        (**self).stop(layer, at)
    }

    fn ramp(
        &mut self,
        layer: LayerRef,
        target: f32,
        duration: f64,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        (**self).ramp(layer, target, duration, at)
    }

    fn is_playing(&self, layer: LayerRef) -> bool {
        (**self).is_playing(layer)
    }

    fn clip_duration(&self, clip: ClipKey) -> Option<f64> {
        (**self).clip_duration(clip)
    }

    fn poll(&mut self) {
        (**self).poll()
    }
}
