//! Scheduled layer events.

use crate::dsp_time::DspTime;

/// Identifies a scheduled event for later retargeting or cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

/// Addresses one layer of one played segment.
///
/// `segment` is the sequence cursor the layer was started under, so a
/// segment that appears twice in the order gets distinct references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerRef {
    pub segment: usize,
    pub layer: usize,
}

impl LayerRef {
    pub const fn new(segment: usize, layer: usize) -> Self {
        Self { segment, layer }
    }
}

/// What a scheduled event does to its layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayerAction {
    /// Begin playback at the layer's current volume
    Start,
    /// Stop playback
    Stop,
    /// Ramp volume linearly to `target` over `duration` seconds
    RampVolume { target: f32, duration: f64 },
}

/// A (time, action) pair waiting in the layer scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledEvent {
    pub id: EventId,
    /// When the event should take effect on the audio clock
    pub fire_time: DspTime,
    /// Which layer it applies to
    pub target: LayerRef,
    /// What it does
    pub action: LayerAction,
}

impl ScheduledEvent {
    pub fn new(id: EventId, fire_time: DspTime, target: LayerRef, action: LayerAction) -> Self {
        Self { id, fire_time, target, action }
    }
}
