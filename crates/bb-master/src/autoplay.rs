//! Scripted input.

use bb_engine::{AudioBackend, ClockSource};
use log::{debug, warn};

use crate::Session;

/// Strikes the notes of the active segment as their times come up.
///
/// Each strike lands `offset` seconds after its note. With `skip_every`
/// set, every n-th note is left alone so it scrolls out as a miss.
#[derive(Clone, Debug, Default)]
pub struct Autoplay {
    pub offset: f64,
    pub skip_every: Option<usize>,
    segment: Option<usize>,
    next: usize,
    seen: usize,
}

impl Autoplay {
    pub fn new(offset: f64) -> Self {
        Self { offset, ..Self::default() }
    }

    pub fn skip_every(mut self, n: usize) -> Self {
        self.skip_every = (n > 0).then_some(n);
        self
    }

    /// Strike every note now due. Returns the number of strikes.
    pub fn drive<B: AudioBackend + ClockSource>(&mut self, session: &mut Session<B>) -> usize {
        let cursor = session.sequencer().cursor();
        if cursor != self.segment {
            self.segment = cursor;
            self.next = 0;
        }
        let Some(time) = session.playback_time() else {
            return 0;
        };

        let mut strikes = 0;
        while let Some(note) = session.timeline().notes().get(self.next).copied() {
            let strike = note.time_stamp + self.offset;
            if strike > time {
                break;
            }
            self.next += 1;
            self.seen += 1;
            if self.skip_every.is_some_and(|n| self.seen % n == 0) {
                debug!("autoplay skips lane {} at {:.3}s", note.lane, note.time_stamp);
                continue;
            }
            match session.judge_at(note.lane, strike) {
                Ok(_) => strikes += 1,
                Err(err) => warn!("autoplay strike rejected: {}", err),
            }
        }
        strikes
    }
}
