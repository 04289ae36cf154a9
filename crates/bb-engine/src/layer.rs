//! Runtime state of playing layers.

use alloc::vec::Vec;
use bb_ir::{ClipKey, DspTime, LayerDef, LayerRef, Name, SegmentDef};

/// Where a layer is in its playback lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Playback {
    #[default]
    Stopped,
    /// Start committed to the backend for a future instant.
    Scheduled { start: DspTime },
    Playing { since: DspTime },
    /// Stop committed to the backend for a future instant.
    Stopping { at: DspTime },
}

/// A linear volume change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeRamp {
    pub from: f32,
    pub to: f32,
    pub start: DspTime,
    /// Seconds
    pub duration: f64,
}

impl VolumeRamp {
    /// Volume at `time`, holding `from` before the start and `to` after the end.
    pub fn value_at(&self, time: DspTime) -> f32 {
        let elapsed = time - self.start;
        if elapsed <= 0.0 {
            self.from
        } else if self.duration <= 0.0 || elapsed >= self.duration {
            self.to
        } else {
            let t = (elapsed / self.duration) as f32;
            self.from + (self.to - self.from) * t
        }
    }

    pub fn end(&self) -> DspTime {
        self.start + self.duration.max(0.0)
    }
}

/// One instrument stem of a loaded segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: Name,
    pub clip: ClipKey,
    pub base_volume: f32,
    pub looping: bool,
    pub primary: bool,
    current_volume: f32,
    target_volume: f32,
    ramp: Option<VolumeRamp>,
    playback: Playback,
}

impl Layer {
    pub fn new(def: &LayerDef) -> Self {
        Self {
            name: def.name,
            clip: def.clip,
            base_volume: def.base_volume,
            looping: def.looping,
            primary: def.primary,
            current_volume: def.base_volume,
            target_volume: def.base_volume,
            ramp: None,
            playback: Playback::Stopped,
        }
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Volume as of the last update.
    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    /// Volume the layer is at or ramping toward.
    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    pub fn ramp(&self) -> Option<&VolumeRamp> {
        self.ramp.as_ref()
    }

    /// Playing, or committed to start. A layer committed to stop still
    /// counts until its stop instant passes.
    pub fn is_active(&self) -> bool {
        !matches!(self.playback, Playback::Stopped)
    }

    /// Whether audio for this layer is audible at `time`.
    pub fn is_sounding_at(&self, time: DspTime) -> bool {
        match self.playback {
            Playback::Playing { since } => since <= time,
            Playback::Scheduled { start } => start <= time,
            Playback::Stopping { at } => time < at,
            Playback::Stopped => false,
        }
    }

    pub(crate) fn mark_started(&mut self, at: DspTime, now: DspTime) {
        self.playback = if at > now {
            Playback::Scheduled { start: at }
        } else {
            Playback::Playing { since: at }
        };
    }

    pub(crate) fn mark_stopped(&mut self, at: DspTime, now: DspTime) {
        self.playback = if at > now && self.is_active() {
            Playback::Stopping { at }
        } else {
            Playback::Stopped
        };
    }

    pub(crate) fn begin_ramp(&mut self, at: DspTime, target: f32, duration: f64) {
        let from = match &self.ramp {
            Some(ramp) => ramp.value_at(at),
            None => self.current_volume,
        };
        self.ramp = Some(VolumeRamp { from, to: target, start: at, duration });
        self.target_volume = target;
    }

    /// Advance time-driven state to `now`.
    pub(crate) fn update(&mut self, now: DspTime) {
        match self.playback {
            Playback::Scheduled { start } if start <= now => {
                self.playback = Playback::Playing { since: start };
            }
            Playback::Stopping { at } if at <= now => {
                self.playback = Playback::Stopped;
            }
            _ => {}
        }
        if let Some(ramp) = self.ramp {
            self.current_volume = ramp.value_at(now);
            if now >= ramp.end() {
                self.ramp = None;
            }
        }
    }
}

/// The layers of one played segment, keyed by sequence cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSet {
    pub segment: usize,
    pub name: Name,
    pub layers: Vec<Layer>,
}

impl LayerSet {
    pub fn load(segment: usize, def: &SegmentDef) -> Self {
        Self {
            segment,
            name: def.name,
            layers: def.layers.iter().map(Layer::new).collect(),
        }
    }

    pub fn layer_ref(&self, index: usize) -> LayerRef {
        LayerRef::new(self.segment, index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name.as_str() == name)
    }

    pub fn any_active(&self) -> bool {
        self.layers.iter().any(Layer::is_active)
    }
}

/// Every loaded layer set: the active segment plus any still winding down.
#[derive(Clone, Debug, Default)]
pub struct LayerTable {
    sets: Vec<LayerSet>,
}

impl LayerTable {
    pub fn new() -> Self {
        Self { sets: Vec::new() }
    }

    pub fn insert(&mut self, set: LayerSet) {
        self.sets.retain(|s| s.segment != set.segment);
        self.sets.push(set);
    }

    pub fn set(&self, segment: usize) -> Option<&LayerSet> {
        self.sets.iter().find(|s| s.segment == segment)
    }

    pub fn get(&self, layer: LayerRef) -> Option<&Layer> {
        self.set(layer.segment)?.layers.get(layer.layer)
    }

    pub fn get_mut(&mut self, layer: LayerRef) -> Option<&mut Layer> {
        self.sets
            .iter_mut()
            .find(|s| s.segment == layer.segment)?
            .layers
            .get_mut(layer.layer)
    }

    pub fn update(&mut self, now: DspTime) {
        for set in &mut self.sets {
            for layer in &mut set.layers {
                layer.update(now);
            }
        }
    }

    /// Drop every set other than `keep` whose layers have all stopped.
    pub fn prune(&mut self, keep: Option<usize>) {
        self.sets.retain(|s| Some(s.segment) == keep || s.any_active());
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerSet> {
        self.sets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bb_ir::{Clip, ClipBank, TempoConfig};

    fn layer(volume: f32) -> Layer {
        let mut bank = ClipBank::new();
        let clip = bank.insert(Clip::new("c", 10, alloc::vec![0.0; 10]));
        Layer::new(&LayerDef::new("Layer 1", clip).unwrap().with_volume(volume))
    }

    #[test]
    fn ramp_interpolates_and_settles() {
        let mut l = layer(0.0);
        l.begin_ramp(DspTime::from_secs(1.0), 1.0, 0.2);
        assert_eq!(l.target_volume(), 1.0);

        l.update(DspTime::from_secs(0.9));
        assert_eq!(l.current_volume(), 0.0);
        l.update(DspTime::from_secs(1.1));
        assert_relative_eq!(l.current_volume(), 0.5, epsilon = 1e-6);
        l.update(DspTime::from_secs(1.5));
        assert_eq!(l.current_volume(), 1.0);
        assert!(l.ramp().is_none());
    }

    #[test]
    fn ramp_replaced_midway_starts_from_current_value() {
        let mut l = layer(0.0);
        l.begin_ramp(DspTime::from_secs(0.0), 1.0, 1.0);
        l.begin_ramp(DspTime::from_secs(0.5), 0.0, 1.0);
        let ramp = l.ramp().unwrap();
        assert_relative_eq!(ramp.from, 0.5, epsilon = 1e-6);
        assert_eq!(ramp.to, 0.0);
    }

    #[test]
    fn scheduled_start_becomes_playing() {
        let mut l = layer(1.0);
        l.mark_started(DspTime::from_secs(2.0), DspTime::from_secs(1.95));
        assert_eq!(l.playback(), Playback::Scheduled { start: DspTime::from_secs(2.0) });
        assert!(l.is_active());
        assert!(!l.is_sounding_at(DspTime::from_secs(1.99)));

        l.update(DspTime::from_secs(2.01));
        assert_eq!(l.playback(), Playback::Playing { since: DspTime::from_secs(2.0) });
    }

    #[test]
    fn future_stop_keeps_layer_active_until_it_passes() {
        let mut l = layer(1.0);
        l.mark_started(DspTime::ZERO, DspTime::ZERO);
        l.mark_stopped(DspTime::from_secs(1.0), DspTime::from_secs(0.95));
        assert!(l.is_active());
        l.update(DspTime::from_secs(1.0));
        assert!(!l.is_active());
    }

    #[test]
    fn table_prunes_finished_sets() {
        let mut bank = ClipBank::new();
        let clip = bank.insert(Clip::new("c", 10, alloc::vec![0.0; 10]));
        let def = SegmentDef::new("Intro", TempoConfig::common(120.0).unwrap())
            .unwrap()
            .with_layer(LayerDef::new("Base", clip).unwrap().primary());

        let mut table = LayerTable::new();
        table.insert(LayerSet::load(0, &def));
        table.insert(LayerSet::load(1, &def));
        table.get_mut(LayerRef::new(0, 0)).unwrap().mark_started(DspTime::ZERO, DspTime::ZERO);

        table.prune(Some(1));
        assert_eq!(table.len(), 2);
        table.get_mut(LayerRef::new(0, 0)).unwrap().mark_stopped(DspTime::ZERO, DspTime::ZERO);
        table.prune(Some(1));
        assert_eq!(table.len(), 1);
        assert!(table.set(1).is_some());
    }
}
