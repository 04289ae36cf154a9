//! Audio clips referenced by layers.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use slotmap::SlotMap;

use crate::error::ConfigError;

slotmap::new_key_type! {
    /// Key for referencing clips in a `ClipBank`.
    pub struct ClipKey;
}

/// Mono PCM audio owned by the clip bank.
#[derive(Clone, Debug, Default)]
pub struct Clip {
    /// Clip name, used by sequence definitions to refer to it
    pub name: ArrayString<32>,
    /// Sample rate of `data` in Hz
    pub sample_rate: u32,
    /// Samples in [-1, 1]
    pub data: Vec<f32>,
}

impl Clip {
    /// Create a clip from mono samples.
    pub fn new(name: &str, sample_rate: u32, data: Vec<f32>) -> Self {
        let mut clip = Self { name: ArrayString::new(), sample_rate, data };
        let _ = clip.name.try_push_str(name);
        clip
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }
}

/// All clips available to the audio backend.
#[derive(Clone, Debug, Default)]
pub struct ClipBank {
    clips: SlotMap<ClipKey, Clip>,
}

impl ClipBank {
    pub fn new() -> Self {
        Self { clips: SlotMap::with_key() }
    }

    pub fn insert(&mut self, clip: Clip) -> ClipKey {
        self.clips.insert(clip)
    }

    pub fn get(&self, key: ClipKey) -> Option<&Clip> {
        self.clips.get(key)
    }

    pub fn remove(&mut self, key: ClipKey) -> Option<Clip> {
        self.clips.remove(key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Look a clip up by name.
    pub fn find(&self, name: &str) -> Option<ClipKey> {
        self.clips
            .iter()
            .find(|(_, clip)| clip.name.as_str() == name)
            .map(|(key, _)| key)
    }

    /// Look a clip up by name, failing with a configuration error.
    pub fn resolve(&self, name: &str) -> Result<ClipKey, ConfigError> {
        self.find(name)
            .ok_or_else(|| ConfigError::UnknownClip(alloc::string::String::from(name)))
    }

    /// Duration of a clip in seconds.
    pub fn duration(&self, key: ClipKey) -> Option<f64> {
        self.clips.get(key).map(Clip::duration)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClipKey, &Clip)> {
        self.clips.iter()
    }
}
