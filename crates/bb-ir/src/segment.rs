//! Segment and sequence definitions.
//!
//! A sequence is an ordered list of segment names resolved against a table
//! of segment definitions. Each segment is a set of simultaneous layers
//! sharing one tempo, with exactly one primary layer whose natural end
//! drives the sequence forward.

use alloc::string::String;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::clip::ClipKey;
use crate::error::ConfigError;
use crate::tempo::TempoConfig;

/// Fixed-capacity name used for segments and layers.
pub type Name = ArrayString<32>;

/// Convert a string into a `Name`, rejecting names that do not fit.
pub fn name(s: &str) -> Result<Name, ConfigError> {
    ArrayString::from(s).map_err(|_| ConfigError::NameTooLong(String::from(s)))
}

/// One instrument stem within a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerDef {
    /// Name, unique within the segment
    pub name: Name,
    /// Audio to play
    pub clip: ClipKey,
    /// Volume the layer starts at (0.0-1.0)
    pub base_volume: f32,
    /// Restart from the beginning when the clip ends
    pub looping: bool,
    /// Whether this layer's natural end advances the sequence
    pub primary: bool,
}

impl LayerDef {
    pub fn new(name: &str, clip: ClipKey) -> Result<Self, ConfigError> {
        Ok(Self {
            name: self::name(name)?,
            clip,
            base_volume: 1.0,
            looping: false,
            primary: false,
        })
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.base_volume = volume;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// A named section of the composition (intro, loop, outro, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentDef {
    pub name: Name,
    pub tempo: TempoConfig,
    pub layers: Vec<LayerDef>,
    /// Whether layer volume requests are honoured in this segment
    pub layering: bool,
}

impl SegmentDef {
    pub fn new(name: &str, tempo: TempoConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: self::name(name)?,
            tempo,
            layers: Vec::new(),
            layering: true,
        })
    }

    pub fn with_layer(mut self, layer: LayerDef) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_layering(mut self, layering: bool) -> Self {
        self.layering = layering;
        self
    }

    /// Index of a layer by name.
    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name.as_str() == name)
    }

    /// Index of the primary layer, once validated.
    pub fn primary_index(&self) -> Option<usize> {
        self.layers.iter().position(|l| l.primary)
    }

    /// Check the segment's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let segment = || String::from(self.name.as_str());

        let primaries = self.layers.iter().filter(|l| l.primary).count();
        match primaries {
            0 => return Err(ConfigError::MissingPrimary(segment())),
            1 => {}
            _ => return Err(ConfigError::MultiplePrimary(segment())),
        }

        for (i, layer) in self.layers.iter().enumerate() {
            if !(0.0..=1.0).contains(&layer.base_volume) {
                return Err(ConfigError::VolumeOutOfRange(layer.base_volume));
            }
            if self.layers[..i].iter().any(|l| l.name == layer.name) {
                return Err(ConfigError::DuplicateLayer {
                    segment: segment(),
                    layer: String::from(layer.name.as_str()),
                });
            }
        }
        Ok(())
    }
}

/// A sequence definition as authored: a segment table plus a play order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequenceDef {
    pub segments: Vec<SegmentDef>,
    pub order: Vec<Name>,
}

impl SequenceDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment(mut self, segment: SegmentDef) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn then(mut self, segment: &str) -> Result<Self, ConfigError> {
        self.order.push(name(segment)?);
        Ok(self)
    }

    /// Validate every segment and resolve the play order.
    pub fn resolve(&self) -> Result<Sequence, ConfigError> {
        for (i, segment) in self.segments.iter().enumerate() {
            segment.validate()?;
            if self.segments[..i].iter().any(|s| s.name == segment.name) {
                return Err(ConfigError::DuplicateSegment(String::from(segment.name.as_str())));
            }
        }
        if self.order.is_empty() {
            return Err(ConfigError::EmptySequence);
        }

        let segments = self
            .order
            .iter()
            .map(|entry| {
                self.segments
                    .iter()
                    .find(|s| s.name == *entry)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownSegment(String::from(entry.as_str())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Sequence { segments })
    }
}

/// A validated sequence: segments in play order.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    segments: Vec<SegmentDef>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SegmentDef> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[SegmentDef] {
        &self.segments
    }
}
