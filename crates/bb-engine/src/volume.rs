//! Layer volume requests, quantized to measure boundaries.

use alloc::collections::BTreeMap;
use alloc::string::String;
use bb_ir::{ConfigError, DspTime, EventId, LayerAction, LayerRef, PlayError};
use log::{debug, warn};

use crate::beat_clock::Granularity;
use crate::error::EngineError;
use crate::layer::Layer;
use crate::scheduler::LayerScheduler;
use crate::sequencer::MusicSequencer;

/// Volume controller tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeConfig {
    /// Length of every requested fade, in seconds
    pub ramp_duration: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self { ramp_duration: 0.2 }
    }
}

/// What a volume request turned into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VolumeRequest {
    /// A new ramp was queued for the boundary.
    Scheduled { id: EventId, at: DspTime },
    /// An earlier request's ramp now carries the new target at its original
    /// boundary. `id` is the event that will deliver it.
    Superseded { id: EventId, at: DspTime },
    /// The layer already is, or already will be, at this volume.
    Unchanged,
}

#[derive(Clone, Copy, Debug)]
struct PendingRamp {
    id: EventId,
    target: f32,
    at: DspTime,
}

impl PendingRamp {
    /// Still queued, or committed to the backend and not yet begun.
    fn is_live(
        &self,
        layer: LayerRef,
        now: DspTime,
        sequencer: &MusicSequencer,
        scheduler: &LayerScheduler,
    ) -> bool {
        scheduler.is_pending(self.id) || (self.at > now && self.is_committed(layer, sequencer))
    }

    fn is_committed(&self, layer: LayerRef, sequencer: &MusicSequencer) -> bool {
        sequencer
            .layer(layer)
            .and_then(Layer::ramp)
            .is_some_and(|ramp| ramp.start == self.at && ramp.to == self.target)
    }
}

/// Turns "layer X should be at volume Y" into at most one scheduled fade
/// per layer and boundary.
#[derive(Debug, Default)]
pub struct LayerVolumeController {
    config: VolumeConfig,
    pending: BTreeMap<LayerRef, PendingRamp>,
}

impl LayerVolumeController {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config, pending: BTreeMap::new() }
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Request that layer `name` of the active segment fade to `target`
    /// on the next measure boundary.
    pub fn set_layer_target(
        &mut self,
        name: &str,
        target: f32,
        now: DspTime,
        sequencer: &MusicSequencer,
        scheduler: &mut LayerScheduler,
    ) -> Result<VolumeRequest, EngineError> {
        if !(0.0..=1.0).contains(&target) {
            return Err(ConfigError::VolumeOutOfRange(target).into());
        }
        let layer_ref = sequencer.layer_ref(name)?;
        let (Some(segment), Some(clock)) = (sequencer.current_segment(), sequencer.clock()) else {
            return Err(PlayError::NotActive.into());
        };
        if !segment.layering {
            warn!("layering is disabled in '{}', request for '{}' ignored", segment.name, name);
            return Err(PlayError::LayeringDisabled(String::from(segment.name.as_str())).into());
        }

        self.prune(now, sequencer, scheduler);

        let current = match (self.pending.get(&layer_ref), sequencer.layer(layer_ref)) {
            (Some(pending), _) => pending.target,
            (None, Some(layer)) => layer.target_volume(),
            (None, None) => return Err(PlayError::NotActive.into()),
        };
        if libm::fabsf(current - target) <= f32::EPSILON {
            return Ok(VolumeRequest::Unchanged);
        }

        if let Some(pending) = self.pending.get_mut(&layer_ref) {
            if scheduler.retarget(pending.id, target) {
                debug!(
                    "'{}' now ramps to {:.2} at {:.4}s (was {:.2})",
                    name,
                    target,
                    pending.at.as_secs(),
                    pending.target
                );
                pending.target = target;
                return Ok(VolumeRequest::Superseded { id: pending.id, at: pending.at });
            }

            // Already handed to the backend: a replacement at the same
            // instant overrides it before it begins
            let at = pending.at;
            let id = scheduler.schedule(
                at,
                layer_ref,
                LayerAction::RampVolume { target, duration: self.config.ramp_duration },
            );
            debug!(
                "'{}' committed ramp at {:.4}s replaced: {:.2} -> {:.2}",
                name,
                at.as_secs(),
                pending.target,
                target
            );
            *pending = PendingRamp { id, target, at };
            return Ok(VolumeRequest::Superseded { id, at });
        }

        let at = clock.next_boundary(now, Granularity::Measure);
        let id = scheduler.schedule(
            at,
            layer_ref,
            LayerAction::RampVolume { target, duration: self.config.ramp_duration },
        );
        debug!("'{}' ramps to {:.2} at {:.4}s", name, target, at.as_secs());
        self.pending.insert(layer_ref, PendingRamp { id, target, at });
        Ok(VolumeRequest::Scheduled { id, at })
    }

    /// Forget requests whose ramps have begun, or were dropped with their
    /// segment.
    pub fn prune(&mut self, now: DspTime, sequencer: &MusicSequencer, scheduler: &LayerScheduler) {
        self.pending.retain(|&layer, p| p.is_live(layer, now, sequencer, scheduler));
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::scheduler::SchedulerConfig;
    use bb_ir::{Clip, ClipBank, LayerDef, SegmentDef, SequenceDef, TempoConfig};

    struct Rig {
        scheduler: LayerScheduler,
        backend: RecordingBackend,
        sequencer: MusicSequencer,
        volume: LayerVolumeController,
    }

    fn rig(layering: bool) -> Rig {
        let mut bank = ClipBank::new();
        let clip = bank.insert(Clip::new("loop", 10, alloc::vec![0.0; 20]));
        let def = SequenceDef::new()
            .with_segment(
                SegmentDef::new("LoopA", TempoConfig::common(120.0).unwrap())
                    .unwrap()
                    .with_layering(layering)
                    .with_layer(LayerDef::new("Base", clip).unwrap().primary().looping(true))
                    .with_layer(LayerDef::new("Layer1", clip).unwrap().looping(true).with_volume(0.0)),
            )
            .then("LoopA")
            .unwrap();

        let mut rig = Rig {
            scheduler: LayerScheduler::new(SchedulerConfig::default()),
            backend: RecordingBackend::default(),
            sequencer: MusicSequencer::new(),
            volume: LayerVolumeController::new(VolumeConfig::default()),
        };
        rig.sequencer
            .start(&def, DspTime::ZERO, &mut rig.scheduler, &mut rig.backend)
            .unwrap();
        rig
    }

    impl Rig {
        fn set(&mut self, name: &str, target: f32, now: f64) -> Result<VolumeRequest, EngineError> {
            self.volume.set_layer_target(
                name,
                target,
                DspTime::from_secs(now),
                &self.sequencer,
                &mut self.scheduler,
            )
        }

        fn tick(&mut self, now: f64) {
            self.sequencer
                .tick(DspTime::from_secs(now), &mut self.scheduler, &mut self.backend);
        }
    }

    #[test]
    fn request_lands_on_next_measure() {
        let mut rig = rig(true);
        let request = rig.set("Layer1", 1.0, 0.3).unwrap();
        assert!(matches!(request, VolumeRequest::Scheduled { at, .. } if at == DspTime::from_secs(2.0)));

        rig.tick(1.0);
        assert!(rig.backend.ramps().is_empty());
        rig.tick(1.95);
        assert_eq!(rig.backend.ramps(), [(LayerRef::new(0, 1), 1.0, Some(DspTime::from_secs(2.0)))]);
    }

    #[test]
    fn superseding_keeps_the_original_boundary() {
        let mut rig = rig(true);
        let first = rig.set("Layer1", 1.0, 0.3).unwrap();
        let second = rig.set("Layer1", 0.0, 1.7).unwrap();
        let (VolumeRequest::Scheduled { id, at }, VolumeRequest::Superseded { id: id2, at: at2 }) = (first, second)
        else {
            panic!("unexpected requests {first:?} {second:?}");
        };
        assert_eq!((id, at), (id2, at2));

        rig.tick(1.95);
        rig.tick(2.5);
        assert_eq!(rig.backend.ramps(), [(LayerRef::new(0, 1), 0.0, Some(DspTime::from_secs(2.0)))]);
    }

    #[test]
    fn superseding_a_committed_ramp_replaces_it_at_the_boundary() {
        let mut rig = rig(true);
        let boundary = DspTime::from_secs(2.0);
        let first = rig.set("Layer1", 1.0, 0.3).unwrap();
        rig.tick(1.95);
        assert_eq!(rig.backend.ramps(), [(LayerRef::new(0, 1), 1.0, Some(boundary))]);
        assert_eq!(rig.volume.pending_count(), 1);

        let second = rig.set("Layer1", 0.0, 1.96).unwrap();
        let VolumeRequest::Superseded { id, at } = second else {
            panic!("expected the committed ramp to be superseded, got {:?}", second);
        };
        assert_eq!(at, boundary);
        assert_ne!(VolumeRequest::Scheduled { id, at }, first);
        assert_eq!(rig.set("Layer1", 0.0, 1.97), Ok(VolumeRequest::Unchanged));

        rig.tick(1.98);
        assert_eq!(
            rig.backend.ramps(),
            [(LayerRef::new(0, 1), 1.0, Some(boundary)), (LayerRef::new(0, 1), 0.0, Some(boundary))]
        );
        let layer = rig.sequencer.layer(LayerRef::new(0, 1)).unwrap();
        assert_eq!(layer.target_volume(), 0.0);
        assert_eq!(layer.ramp().map(|r| (r.start, r.from)), Some((boundary, 0.0)));

        rig.tick(2.5);
        rig.volume.prune(DspTime::from_secs(2.5), &rig.sequencer, &rig.scheduler);
        assert_eq!(rig.volume.pending_count(), 0);
        assert_eq!(rig.scheduler.stats().misses, 0);
    }

    #[test]
    fn same_target_is_a_no_op() {
        let mut rig = rig(true);
        assert_eq!(rig.set("Layer1", 0.0, 0.3), Ok(VolumeRequest::Unchanged));
        assert!(matches!(rig.set("Layer1", 0.6, 0.3), Ok(VolumeRequest::Scheduled { .. })));
        assert_eq!(rig.set("Layer1", 0.6, 0.4), Ok(VolumeRequest::Unchanged));

        rig.tick(1.95);
        assert_eq!(rig.set("Layer1", 0.6, 2.1), Ok(VolumeRequest::Unchanged));
        assert_eq!(rig.volume.pending_count(), 0);
    }

    #[test]
    fn invalid_requests() {
        let mut rig = rig(true);
        assert!(matches!(
            rig.set("Layer9", 1.0, 0.0),
            Err(EngineError::Config(ConfigError::UnknownLayer { .. }))
        ));
        assert_eq!(
            rig.set("Layer1", 1.5, 0.0),
            Err(EngineError::Config(ConfigError::VolumeOutOfRange(1.5)))
        );
    }

    #[test]
    fn disabled_layering_ignores_requests() {
        let mut rig = rig(false);
        assert_eq!(
            rig.set("Layer1", 1.0, 0.0),
            Err(EngineError::Play(PlayError::LayeringDisabled("LoopA".into())))
        );
        assert_eq!(rig.scheduler.pending_count(), 0);
    }
}
