//! Clock sources.
//!
//! The tick loop reads the audio clock; it never drives it. Every time used
//! for scheduling, note positions and judgment comes from a `ClockSource`.

use core::cell::Cell;

use bb_ir::DspTime;

/// A monotonically increasing, hardware-derived time source.
pub trait ClockSource {
    /// Current instant on the audio clock.
    fn now(&self) -> DspTime;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> DspTime {
        (**self).now()
    }
}

/// A clock advanced by hand, for tests and scripted runs.
///
/// Refuses to go backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<DspTime>,
}

impl ManualClock {
    pub fn new(start: DspTime) -> Self {
        Self { now: Cell::new(start) }
    }

    /// Jump to `time` if it is not earlier than the current instant.
    pub fn set(&self, time: DspTime) {
        if time >= self.now.get() {
            self.now.set(time);
        }
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: f64) {
        self.set(self.now.get() + secs.max(0.0));
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DspTime {
        self.now.get()
    }
}
