//! Hit statistics.

use bb_ir::Signal;

use crate::router::SignalSink;

/// Running totals over judgment signals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scoreboard {
    pub hits: u32,
    pub misses: u32,
    pub bad_inputs: u32,
    pub combo: u32,
    pub max_combo: u32,
    abs_error_sum: f64,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, signal: &Signal) {
        match *signal {
            Signal::NoteHit { delta, .. } => {
                self.hits += 1;
                self.combo += 1;
                self.max_combo = self.max_combo.max(self.combo);
                self.abs_error_sum += delta.abs();
            }
            Signal::NoteMiss { .. } => {
                self.misses += 1;
                self.combo = 0;
            }
            Signal::BadInput { .. } => {
                self.bad_inputs += 1;
                self.combo = 0;
            }
            Signal::SegmentAdvanced { .. } | Signal::SequenceFinished => {}
        }
    }

    /// Mean absolute timing error of hits, in seconds.
    pub fn mean_abs_error(&self) -> Option<f64> {
        (self.hits > 0).then(|| self.abs_error_sum / self.hits as f64)
    }

    /// Fraction of notes hit, counting bad inputs against the player.
    pub fn accuracy(&self) -> Option<f64> {
        let judged = self.hits + self.misses + self.bad_inputs;
        (judged > 0).then(|| self.hits as f64 / judged as f64)
    }
}

impl SignalSink for Scoreboard {
    fn on_signal(&mut self, signal: &Signal) {
        self.record(signal);
    }
}

impl std::fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits {}  misses {}  bad {}  max combo {}",
            self.hits, self.misses, self.bad_inputs, self.max_combo
        )?;
        if let Some(err) = self.mean_abs_error() {
            write!(f, "  mean error {:.1} ms", err * 1000.0)?;
        }
        Ok(())
    }
}
