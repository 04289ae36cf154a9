//! Audio frame type.

/// A stereo audio frame, samples nominally in [-1, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Scale both channels.
    pub fn apply_gain(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }

    /// Convert to clamped 16-bit PCM (left, right).
    pub fn to_i16(self) -> (i16, i16) {
        let convert = |s: f32| (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        (convert(self.left), convert(self.right))
    }
}
