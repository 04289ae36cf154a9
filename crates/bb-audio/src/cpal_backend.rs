//! CPAL-based audio output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bb_engine::{AudioBackend, BackendError, ClockSource};
use bb_ir::{ClipBank, ClipKey, DspTime, LayerRef};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use log::{error, info};

use crate::error::AudioError;
use crate::link::{link, AudioRenderer, DeviceBackend, DeviceClock};

/// Plays layers through the default output device.
///
/// The layer mixer runs inside the device callback; this handle is the
/// tick-side backend and clock.
pub struct CpalLayerOutput {
    backend: DeviceBackend,
    stream: Stream,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl CpalLayerOutput {
    /// Open the default device and build a paused stream over `bank`.
    pub fn new(bank: ClipBank) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let mut config: StreamConfig = config.into();
        // Force stereo output; the renderer writes one stereo pair per frame
        config.channels = 2;
        let sample_rate = config.sample_rate.0;
        info!(
            "audio device '{}' at {} Hz, {} channels",
            device.name().unwrap_or_default(),
            sample_rate,
            config.channels
        );

        let (backend, renderer) = link(bank, sample_rate);
        let running = Arc::new(AtomicBool::new(false));
        let stream = build_stream(&device, &config, renderer, running.clone())?;

        Ok(Self { backend, stream, running, sample_rate })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clock(&self) -> &DeviceClock {
        self.backend.clock()
    }

    /// Start pulling audio from the mixer.
    pub fn play(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    pub fn pause(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: AudioRenderer,
    running: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    AudioRenderer::silence(data);
                    return;
                }
                #[cfg(feature = "alloc_check")]
                assert_no_alloc::assert_no_alloc(|| renderer.render_interleaved(data, channels));
                #[cfg(not(feature = "alloc_check"))]
                renderer.render_interleaved(data, channels);
            },
            |err| error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))
}

impl ClockSource for CpalLayerOutput {
    fn now(&self) -> DspTime {
        self.backend.now()
    }
}

impl AudioBackend for CpalLayerOutput {
    fn start(
        &mut self,
        layer: LayerRef,
        clip: ClipKey,
        volume: f32,
        looping: bool,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        self.backend.start(layer, clip, volume, looping, at)
    }

    fn stop(&mut self, layer: LayerRef, at: Option<DspTime>) -> Result<(), BackendError> {
        self.backend.stop(layer, at)
    }

    fn ramp(
        &mut self,
        layer: LayerRef,
        target: f32,
        duration: f64,
        at: Option<DspTime>,
    ) -> Result<(), BackendError> {
        self.backend.ramp(layer, target, duration, at)
    }

    fn is_playing(&self, layer: LayerRef) -> bool {
        self.backend.is_playing(layer)
    }

    fn clip_duration(&self, clip: ClipKey) -> Option<f64> {
        self.backend.clip_duration(clip)
    }

    fn poll(&mut self) {
        self.backend.poll()
    }
}
