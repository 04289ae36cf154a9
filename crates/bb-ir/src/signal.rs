//! Outbound signals.
//!
//! Components push signals into their own `SignalQueue`; the composition
//! root drains the queues once per tick and routes each signal to the
//! subscribers of its kind.

use alloc::vec::Vec;

use crate::segment::Name;

/// Something gameplay or music logic needs to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// Input matched a note. `delta` is input time minus note time.
    NoteHit { lane: usize, time_stamp: f64, delta: f64 },
    /// A note scrolled past its window without being hit.
    NoteMiss { lane: usize, time_stamp: f64 },
    /// Input with no note to match.
    BadInput { lane: usize, time: f64 },
    /// The sequencer moved to a new segment.
    SegmentAdvanced { index: usize, name: Name },
    /// The sequencer ran past its last segment.
    SequenceFinished,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::NoteHit { .. } => SignalKind::NoteHit,
            Signal::NoteMiss { .. } => SignalKind::NoteMiss,
            Signal::BadInput { .. } => SignalKind::BadInput,
            Signal::SegmentAdvanced { .. } => SignalKind::SegmentAdvanced,
            Signal::SequenceFinished => SignalKind::SequenceFinished,
        }
    }

    /// Whether the signal breaks a combo.
    pub fn is_miss(&self) -> bool {
        matches!(self, Signal::NoteMiss { .. } | Signal::BadInput { .. })
    }
}

/// Discriminant of `Signal`, used for subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalKind {
    NoteHit,
    NoteMiss,
    BadInput,
    SegmentAdvanced,
    SequenceFinished,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::NoteHit,
        SignalKind::NoteMiss,
        SignalKind::BadInput,
        SignalKind::SegmentAdvanced,
        SignalKind::SequenceFinished,
    ];
}

/// FIFO of signals emitted by one component.
#[derive(Clone, Debug, Default)]
pub struct SignalQueue {
    signals: Vec<Signal>,
}

impl SignalQueue {
    pub fn new() -> Self {
        Self { signals: Vec::new() }
    }

    pub fn push(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Take all queued signals in emission order.
    pub fn drain(&mut self) -> alloc::vec::Drain<'_, Signal> {
        self.signals.drain(..)
    }

    pub fn as_slice(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut queue = SignalQueue::new();
        queue.push(Signal::BadInput { lane: 1, time: 0.5 });
        queue.push(Signal::SequenceFinished);

        let kinds: Vec<SignalKind> = queue.drain().map(|s| s.kind()).collect();
        assert_eq!(kinds, [SignalKind::BadInput, SignalKind::SequenceFinished]);
        assert!(queue.is_empty());
    }

    #[test]
    fn misses_break_combo() {
        assert!(Signal::NoteMiss { lane: 0, time_stamp: 1.0 }.is_miss());
        assert!(Signal::BadInput { lane: 0, time: 1.0 }.is_miss());
        assert!(!Signal::NoteHit { lane: 0, time_stamp: 1.0, delta: 0.0 }.is_miss());
    }
}
