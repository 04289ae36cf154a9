//! Combo-driven layer volumes.
//!
//! The miss layer plays unless the player's last judgment was a miss. The
//! peak layer plays only while the combo is at or above the threshold.
//! Only changes are emitted; the volume controller quantizes them.

use bb_ir::Signal;
use log::debug;

use crate::config::ComboLayeringConfig;

/// Volume changes produced by one signal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComboChange {
    pub miss: Option<f32>,
    pub peak: Option<f32>,
}

impl ComboChange {
    pub fn is_empty(&self) -> bool {
        self.miss.is_none() && self.peak.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ComboLayering {
    config: ComboLayeringConfig,
    combo: u32,
    missed: bool,
    /// Last volumes requested; `None` until requested in this segment
    miss_applied: Option<bool>,
    peak_applied: Option<bool>,
}

impl ComboLayering {
    pub fn new(config: ComboLayeringConfig) -> Self {
        Self { config, combo: 0, missed: false, miss_applied: None, peak_applied: None }
    }

    pub fn config(&self) -> &ComboLayeringConfig {
        &self.config
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn observe(&mut self, signal: &Signal) -> ComboChange {
        match signal {
            Signal::NoteHit { .. } => {
                self.combo += 1;
                self.missed = false;
            }
            Signal::NoteMiss { .. } | Signal::BadInput { .. } => {
                self.combo = 0;
                self.missed = true;
            }
            Signal::SegmentAdvanced { .. } => {
                // New layers start at their authored volumes
                self.miss_applied = None;
                self.peak_applied = None;
            }
            Signal::SequenceFinished => return ComboChange::default(),
        }

        let miss_on = !self.missed;
        let peak_on = self.combo >= self.config.threshold;
        let change = ComboChange {
            miss: diff(&mut self.miss_applied, miss_on),
            peak: diff(&mut self.peak_applied, peak_on),
        };
        if !change.is_empty() {
            debug!("combo {}: {:?}", self.combo, change);
        }
        change
    }

    /// Pair each change with the layer it applies to.
    pub fn requests(&self, change: ComboChange) -> impl Iterator<Item = (&str, f32)> + '_ {
        [(self.config.miss_layer.as_str(), change.miss), (self.config.peak_layer.as_str(), change.peak)]
            .into_iter()
            .filter_map(|(name, target)| Some((name, target?)))
    }
}

fn diff(applied: &mut Option<bool>, on: bool) -> Option<f32> {
    if *applied == Some(on) {
        return None;
    }
    *applied = Some(on);
    Some(if on { 1.0 } else { 0.0 })
}
