//! Session tuning.

use bb_engine::{SchedulerConfig, TimelineConfig, VolumeConfig};

/// Which layers the combo policy drives, and when.
#[derive(Clone, Debug, PartialEq)]
pub struct ComboLayeringConfig {
    /// Audible unless the last judgment was a miss
    pub miss_layer: String,
    /// Audible while the combo is at or above `threshold`
    pub peak_layer: String,
    pub threshold: u32,
}

impl Default for ComboLayeringConfig {
    fn default() -> Self {
        Self {
            miss_layer: "Layer1".to_string(),
            peak_layer: "Layer2".to_string(),
            threshold: 10,
        }
    }
}

/// Everything a `Session` needs besides the sequence itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub scheduler: SchedulerConfig,
    pub volume: VolumeConfig,
    pub timeline: TimelineConfig,
    /// `None` leaves layer volumes to the caller
    pub combo: Option<ComboLayeringConfig>,
}

impl SessionConfig {
    /// Defaults with the combo policy switched on.
    pub fn with_combo_layering() -> Self {
        Self { combo: Some(ComboLayeringConfig::default()), ..Self::default() }
    }
}
