//! Note timeline and hit detection.
//!
//! Playback time always comes from the audio clock (seconds since the
//! active segment started). Each `advance` recycles resolved notes, spawns
//! notes entering the lead window, repositions live notes and expires the
//! ones that scrolled past their hit window. `judge` matches input against
//! the state left by the last `advance`.

use alloc::vec::Vec;
use bb_ir::{ConfigError, EventNote, PlayError, Signal, SignalQueue};
use log::{debug, warn};

use crate::note_pool::{NoteKey, NotePool, NoteState};

/// Tolerance around a note's time within which input counts as a hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitWindow {
    /// Earliest accepted offset, seconds (<= 0)
    pub early: f64,
    /// Latest accepted offset, seconds (>= 0)
    pub late: f64,
}

impl HitWindow {
    pub const fn symmetric(half_width: f64) -> Self {
        Self { early: -half_width, late: half_width }
    }

    pub fn contains(&self, delta: f64) -> bool {
        delta >= self.early && delta <= self.late
    }
}

impl Default for HitWindow {
    fn default() -> Self {
        Self::symmetric(0.15)
    }
}

/// Timeline tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineConfig {
    pub lane_count: usize,
    /// Number of visual variants in the note pool
    pub note_kinds: usize,
    /// Visual kind per lane; lanes past the end use `lane % note_kinds`
    pub lane_kinds: Vec<usize>,
    /// How far ahead of its time a note is spawned, seconds
    pub lead_time: f64,
    /// Scroll units per second
    pub scroll_speed: f32,
    pub hit_window: HitWindow,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            lane_count: 3,
            note_kinds: 3,
            lane_kinds: alloc::vec![0, 1, 2],
            lead_time: 2.0,
            scroll_speed: 1.0,
            hit_window: HitWindow::default(),
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::NonPositive { what: "lane count", value: 0.0 });
        }
        if self.note_kinds == 0 {
            return Err(ConfigError::NonPositive { what: "note kinds", value: 0.0 });
        }
        if !(self.lead_time > 0.0) {
            return Err(ConfigError::NonPositive { what: "lead time", value: self.lead_time });
        }
        if !(self.scroll_speed > 0.0) {
            return Err(ConfigError::NonPositive {
                what: "scroll speed",
                value: self.scroll_speed as f64,
            });
        }
        if self.hit_window.early > 0.0 {
            return Err(ConfigError::NonPositive {
                what: "hit window early bound (negated)",
                value: -self.hit_window.early,
            });
        }
        if self.hit_window.late < 0.0 {
            return Err(ConfigError::NonPositive { what: "hit window late bound", value: self.hit_window.late });
        }
        for lane in 0..self.lane_count {
            let kind = self.kind_for_lane(lane);
            if kind >= self.note_kinds {
                return Err(ConfigError::UnknownNoteKind { lane, kind, kinds: self.note_kinds });
            }
        }
        Ok(())
    }

    pub fn kind_for_lane(&self, lane: usize) -> usize {
        self.lane_kinds.get(lane).copied().unwrap_or(lane % self.note_kinds.max(1))
    }
}

/// Outcome of a `judge` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Judgment {
    Hit { time_stamp: f64, delta: f64 },
    /// Nothing in the lane was within the window.
    BadInput,
}

/// Spawns, positions, expires and judges the notes of one segment.
#[derive(Debug)]
pub struct NoteTimeline {
    config: TimelineConfig,
    notes: Vec<EventNote>,
    next_spawn: usize,
    /// Live keys in spawn order
    live: Vec<NoteKey>,
    pool: NotePool,
    playback_time: f64,
    dropped: usize,
    signals: SignalQueue,
}

impl NoteTimeline {
    pub fn new(config: TimelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = NotePool::new(config.note_kinds);
        Ok(Self {
            config,
            notes: Vec::new(),
            next_spawn: 0,
            live: Vec::new(),
            pool,
            playback_time: f64::NEG_INFINITY,
            dropped: 0,
            signals: SignalQueue::new(),
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Replace the note set. Displayed notes go back to the pool; notes on
    /// lanes outside the configured range are dropped. Returns how many
    /// notes were kept.
    pub fn load_segment_notes(&mut self, notes: &[EventNote]) -> usize {
        self.pool.release_all();
        self.live.clear();
        self.next_spawn = 0;
        self.playback_time = f64::NEG_INFINITY;

        let lanes = self.config.lane_count;
        self.notes.clear();
        self.dropped = 0;
        for note in notes {
            if note.lane < lanes {
                self.notes.push(*note);
            } else {
                self.dropped += 1;
                warn!(
                    "{}",
                    PlayError::OutOfRange { what: "lane", index: note.lane, len: lanes }
                );
            }
        }
        self.notes.sort_by(|a, b| a.time_stamp.total_cmp(&b.time_stamp));
        debug!("loaded {} notes ({} dropped)", self.notes.len(), self.dropped);
        self.notes.len()
    }

    /// Move the timeline to `playback_time` seconds into the segment.
    pub fn advance(&mut self, playback_time: f64) {
        self.playback_time = playback_time;

        // Notes resolved during the previous tick stayed visible for one frame
        let pool = &mut self.pool;
        self.live.retain(|&key| match pool.get(key).map(|n| n.state) {
            Some(NoteState::PendingRecycle) => {
                pool.release(key);
                false
            }
            Some(_) => true,
            None => false,
        });

        let horizon = playback_time + self.config.lead_time;
        while let Some(note) = self.notes.get(self.next_spawn).copied() {
            if note.time_stamp > horizon {
                break;
            }
            self.next_spawn += 1;
            let kind = self.config.kind_for_lane(note.lane);
            match self.pool.acquire(kind, note) {
                Ok(key) => self.live.push(key),
                Err(err) => warn!("note at {:.3}s not spawned: {}", note.time_stamp, err),
            }
        }

        let late = self.config.hit_window.late;
        let speed = self.config.scroll_speed;
        for &key in &self.live {
            let Some(instance) = self.pool.get_mut(key) else {
                continue;
            };
            let ahead = instance.note.time_stamp - playback_time;
            instance.visual.offset = ahead as f32 * speed;
            if instance.is_selectable() && -ahead > late && instance.mark_missed().is_ok() {
                debug!("miss lane {} at {:.3}s", instance.note.lane, instance.note.time_stamp);
                self.signals.push(Signal::NoteMiss {
                    lane: instance.note.lane,
                    time_stamp: instance.note.time_stamp,
                });
                instance.state = NoteState::PendingRecycle;
            }
        }
    }

    /// End the segment at `end` playback seconds. Every note at or before
    /// `end` that is still unjudged misses, spawned or not; later notes are
    /// left for the next load to discard.
    pub fn expire_through(&mut self, end: f64) -> usize {
        let mut expired = 0;
        for &key in &self.live {
            let Some(instance) = self.pool.get_mut(key) else {
                continue;
            };
            if instance.is_selectable() && instance.note.time_stamp <= end && instance.mark_missed().is_ok() {
                self.signals.push(Signal::NoteMiss {
                    lane: instance.note.lane,
                    time_stamp: instance.note.time_stamp,
                });
                instance.state = NoteState::PendingRecycle;
                expired += 1;
            }
        }
        while let Some(note) = self.notes.get(self.next_spawn).copied() {
            if note.time_stamp > end {
                break;
            }
            self.next_spawn += 1;
            self.signals.push(Signal::NoteMiss { lane: note.lane, time_stamp: note.time_stamp });
            expired += 1;
        }
        if expired > 0 {
            debug!("{} notes expired at segment end {:.3}s", expired, end);
        }
        expired
    }

    /// Match a strike in `lane` at `input_time` (playback seconds).
    pub fn judge(&mut self, lane: usize, input_time: f64) -> Result<Judgment, PlayError> {
        if lane >= self.config.lane_count {
            let err = PlayError::OutOfRange { what: "lane", index: lane, len: self.config.lane_count };
            warn!("input ignored: {}", err);
            return Err(err);
        }

        let window = self.config.hit_window;
        let best = self
            .live
            .iter()
            .filter_map(|&key| {
                let instance = self.pool.get(key)?;
                let delta = input_time - instance.note.time_stamp;
                (instance.note.lane == lane && instance.is_selectable() && window.contains(delta))
                    .then_some((key, delta, instance.note.time_stamp))
            })
            .min_by(|a, b| {
                libm::fabs(a.1)
                    .total_cmp(&libm::fabs(b.1))
                    .then(a.2.total_cmp(&b.2))
            });

        let Some((key, delta, time_stamp)) = best else {
            debug!("bad input lane {} at {:.3}s", lane, input_time);
            self.signals.push(Signal::BadInput { lane, time: input_time });
            return Ok(Judgment::BadInput);
        };

        let instance = self.pool.get_mut(key).ok_or(PlayError::NotActive)?;
        instance.mark_judged()?;
        instance.state = NoteState::PendingRecycle;
        debug!("hit lane {} at {:.3}s, delta {:+.3}s", lane, time_stamp, delta);
        self.signals.push(Signal::NoteHit { lane, time_stamp, delta });
        Ok(Judgment::Hit { time_stamp, delta })
    }

    /// Playback time of the last `advance`.
    pub fn playback_time(&self) -> f64 {
        self.playback_time
    }

    pub fn notes(&self) -> &[EventNote] {
        &self.notes
    }

    /// Notes dropped by the last load for being on unknown lanes.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Notes not yet spawned.
    pub fn remaining(&self) -> usize {
        self.notes.len() - self.next_spawn
    }

    /// Every note has been spawned and resolved.
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
            && self
                .live
                .iter()
                .filter_map(|&key| self.pool.get(key))
                .all(|n| !n.is_selectable())
    }

    /// Live notes in spawn order.
    pub fn live(&self) -> impl Iterator<Item = (NoteKey, &crate::note_pool::NoteInstance)> {
        self.live.iter().filter_map(|&key| self.pool.get(key).map(|n| (key, n)))
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    pub fn signals(&mut self) -> &mut SignalQueue {
        &mut self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bb_ir::SignalKind;

    fn timeline(notes: &[EventNote]) -> NoteTimeline {
        let mut t = NoteTimeline::new(TimelineConfig::default()).unwrap();
        t.load_segment_notes(notes);
        t
    }

    fn kinds(t: &mut NoteTimeline) -> Vec<SignalKind> {
        t.signals().drain().map(|s| s.kind()).collect()
    }

    #[test]
    fn hit_then_bad_input() {
        let mut t = timeline(&[EventNote::new(0, 2.0)]);
        t.advance(1.88);

        let hit = t.judge(0, 1.90).unwrap();
        assert!(matches!(hit, Judgment::Hit { time_stamp, .. } if time_stamp == 2.0));
        if let Judgment::Hit { delta, .. } = hit {
            assert_relative_eq!(delta, -0.1, epsilon = 1e-12);
        }
        assert_eq!(t.judge(0, 1.70), Ok(Judgment::BadInput));
        assert_eq!(kinds(&mut t), [SignalKind::NoteHit, SignalKind::BadInput]);
    }

    #[test]
    fn spawns_within_lead_time_only() {
        let mut t = timeline(&[EventNote::new(0, 1.0), EventNote::new(1, 2.5), EventNote::new(2, 4.0)]);
        t.advance(0.0);
        assert_eq!(t.live().count(), 1);
        t.advance(0.5);
        assert_eq!(t.live().count(), 2);
        assert_eq!(t.remaining(), 1);

        let offsets: Vec<f32> = t.live().map(|(_, n)| n.visual.offset).collect();
        assert_relative_eq!(offsets[0], 0.5);
        assert_relative_eq!(offsets[1], 2.0);
    }

    #[test]
    fn expired_notes_miss_once_and_recycle() {
        let mut t = timeline(&[EventNote::new(1, 1.0)]);
        t.advance(0.5);
        t.advance(1.15);
        assert!(kinds(&mut t).is_empty());

        t.advance(1.16);
        assert_eq!(kinds(&mut t), [SignalKind::NoteMiss]);
        assert_eq!(t.live().count(), 1);

        t.advance(1.2);
        assert!(kinds(&mut t).is_empty());
        assert_eq!(t.live().count(), 0);
        assert_eq!(t.pool().free_count(1), 1);
        assert!(t.is_complete());
    }

    #[test]
    fn judged_notes_are_not_selectable_again() {
        let mut t = timeline(&[EventNote::new(0, 1.0)]);
        t.advance(0.9);
        assert!(matches!(t.judge(0, 1.0), Ok(Judgment::Hit { .. })));
        assert_eq!(t.judge(0, 1.0), Ok(Judgment::BadInput));

        t.advance(1.5);
        assert_eq!(kinds(&mut t), [SignalKind::NoteHit, SignalKind::BadInput]);
    }

    #[test]
    fn closest_note_wins_ties_go_earlier() {
        let mut t = timeline(&[EventNote::new(0, 1.0), EventNote::new(0, 1.2)]);
        t.advance(1.0);
        assert_eq!(
            t.judge(0, 1.15).map(|j| matches!(j, Judgment::Hit { time_stamp, .. } if time_stamp == 1.2)),
            Ok(true)
        );

        let mut t = timeline(&[EventNote::new(0, 0.5), EventNote::new(0, 0.75)]);
        t.advance(0.5);
        assert!(matches!(t.judge(0, 0.625), Ok(Judgment::Hit { time_stamp, .. }) if time_stamp == 0.5));
    }

    #[test]
    fn other_lanes_do_not_match() {
        let mut t = timeline(&[EventNote::new(0, 1.0)]);
        t.advance(1.0);
        assert_eq!(t.judge(1, 1.0), Ok(Judgment::BadInput));
    }

    #[test]
    fn out_of_range_lane_is_a_reported_no_op() {
        let mut t = timeline(&[EventNote::new(0, 1.0), EventNote::new(7, 1.0)]);
        assert_eq!(t.dropped(), 1);
        assert_eq!(t.notes().len(), 1);

        t.advance(1.0);
        assert_eq!(
            t.judge(3, 1.0),
            Err(PlayError::OutOfRange { what: "lane", index: 3, len: 3 })
        );
        assert!(kinds(&mut t).is_empty());
    }

    #[test]
    fn reload_recycles_displayed_notes() {
        let mut t = timeline(&[EventNote::new(0, 1.0), EventNote::new(1, 1.5)]);
        t.advance(0.0);
        assert_eq!(t.live().count(), 2);

        t.load_segment_notes(&[EventNote::new(2, 3.0), EventNote::new(2, 0.5)]);
        assert_eq!(t.live().count(), 0);
        assert_eq!(t.pool().live_count(), 0);
        assert_eq!(t.notes()[0].time_stamp, 0.5);

        t.advance(0.0);
        assert_eq!(t.pool().constructed(), 3);
    }

    #[test]
    fn segment_end_expires_reached_notes_only() {
        let mut t = timeline(&[
            EventNote::new(0, 3.0),
            EventNote::new(1, 3.9),
            EventNote::new(2, 3.96),
            EventNote::new(0, 4.5),
        ]);
        t.advance(0.5);
        assert_eq!(t.live().count(), 0);
        t.advance(3.0);
        assert!(matches!(t.judge(0, 3.02), Ok(Judgment::Hit { .. })));
        t.advance(3.95);
        kinds(&mut t);

        // 3.9 is live and inside its window; 3.96 is live but not yet due
        assert_eq!(t.expire_through(4.0), 2);
        let missed: Vec<f64> = t
            .signals()
            .drain()
            .filter_map(|s| match s {
                Signal::NoteMiss { time_stamp, .. } => Some(time_stamp),
                _ => None,
            })
            .collect();
        assert_eq!(missed, [3.9, 3.96]);
        assert_eq!(t.expire_through(4.0), 0);
        assert_eq!(t.remaining(), 0);
    }

    #[test]
    fn segment_end_counts_unspawned_notes() {
        let mut t = timeline(&[EventNote::new(0, 1.0), EventNote::new(1, 5.0)]);
        t.advance(-3.0);
        assert_eq!(t.live().count(), 0);
        assert_eq!(t.expire_through(2.0), 1);
        assert_eq!(kinds(&mut t), [SignalKind::NoteMiss]);
        assert_eq!(t.remaining(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TimelineConfig { lane_kinds: alloc::vec![0, 1, 5], ..Default::default() };
        assert_eq!(
            NoteTimeline::new(config).err(),
            Some(ConfigError::UnknownNoteKind { lane: 2, kind: 5, kinds: 3 })
        );
        let config = TimelineConfig { lead_time: 0.0, ..Default::default() };
        assert!(NoteTimeline::new(config).is_err());
    }
}
