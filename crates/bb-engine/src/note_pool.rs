//! NotePool: recycling of note visuals.
//!
//! Live note instances sit in a generational arena. Releasing an instance
//! invalidates its key and moves its visual back to the free list of its
//! kind, so a later acquire of the same kind reuses it instead of building
//! a new one.

use alloc::vec::Vec;
use bb_ir::{EventNote, PlayError};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key for a live note instance.
    pub struct NoteKey;
}

/// Judgment lifecycle of a live note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteState {
    /// Moving toward the hit line, still selectable.
    #[default]
    Scrolling,
    /// Matched by player input.
    Judged,
    /// Passed its window unhit.
    Missed,
    /// Resolved; goes back to the pool on the next advance.
    PendingRecycle,
}

/// The reusable presentation object behind a note.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteVisual {
    /// Which visual variant this is
    pub kind: usize,
    /// Construction order, stable across reuse
    pub serial: u32,
    /// Lane currently shown in, `None` while pooled
    pub lane: Option<usize>,
    /// Distance from the hit line in scroll units
    pub offset: f32,
    /// Whether the note shown was hit
    pub judged: bool,
}

impl NoteVisual {
    fn reset(&mut self) {
        self.lane = None;
        self.offset = 0.0;
        self.judged = false;
    }
}

/// A note on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteInstance {
    pub note: EventNote,
    pub visual: NoteVisual,
    pub state: NoteState,
}

impl NoteInstance {
    pub fn is_selectable(&self) -> bool {
        self.state == NoteState::Scrolling
    }

    /// Record a hit. A note is judged at most once.
    pub fn mark_judged(&mut self) -> Result<(), PlayError> {
        if !self.is_selectable() {
            return Err(PlayError::DuplicateJudgment {
                lane: self.note.lane,
                time_stamp: self.note.time_stamp,
            });
        }
        self.state = NoteState::Judged;
        self.visual.judged = true;
        Ok(())
    }

    /// Record a miss.
    pub fn mark_missed(&mut self) -> Result<(), PlayError> {
        if !self.is_selectable() {
            return Err(PlayError::DuplicateJudgment {
                lane: self.note.lane,
                time_stamp: self.note.time_stamp,
            });
        }
        self.state = NoteState::Missed;
        Ok(())
    }
}

/// Per-kind free lists plus the live arena.
#[derive(Debug)]
pub struct NotePool {
    live: SlotMap<NoteKey, NoteInstance>,
    free: Vec<Vec<NoteVisual>>,
    constructed: u32,
}

impl NotePool {
    /// Create a pool for `kinds` visual variants.
    pub fn new(kinds: usize) -> Self {
        Self {
            live: SlotMap::with_key(),
            free: (0..kinds).map(|_| Vec::new()).collect(),
            constructed: 0,
        }
    }

    /// Construct `per_kind` visuals of every kind up front.
    pub fn prewarm(&mut self, per_kind: usize) {
        for kind in 0..self.free.len() {
            for _ in 0..per_kind {
                let visual = self.construct(kind);
                self.free[kind].push(visual);
            }
        }
    }

    fn construct(&mut self, kind: usize) -> NoteVisual {
        let serial = self.constructed;
        self.constructed += 1;
        NoteVisual { kind, serial, lane: None, offset: 0.0, judged: false }
    }

    /// Take a visual of `kind` for `note`, reusing a pooled one if possible.
    pub fn acquire(&mut self, kind: usize, note: EventNote) -> Result<NoteKey, PlayError> {
        let kinds = self.free.len();
        let Some(free) = self.free.get_mut(kind) else {
            return Err(PlayError::OutOfRange { what: "note kind", index: kind, len: kinds });
        };
        let mut visual = match free.pop() {
            Some(visual) => visual,
            None => self.construct(kind),
        };
        visual.lane = Some(note.lane);
        Ok(self.live.insert(NoteInstance { note, visual, state: NoteState::Scrolling }))
    }

    /// Return an instance's visual to its free list. The key is stale
    /// afterwards.
    pub fn release(&mut self, key: NoteKey) -> bool {
        let Some(NoteInstance { mut visual, .. }) = self.live.remove(key) else {
            return false;
        };
        visual.reset();
        self.free[visual.kind].push(visual);
        true
    }

    /// Release every live instance.
    pub fn release_all(&mut self) {
        for (_, NoteInstance { mut visual, .. }) in self.live.drain() {
            visual.reset();
            self.free[visual.kind].push(visual);
        }
    }

    pub fn get(&self, key: NoteKey) -> Option<&NoteInstance> {
        self.live.get(key)
    }

    pub fn get_mut(&mut self, key: NoteKey) -> Option<&mut NoteInstance> {
        self.live.get_mut(key)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Pooled visuals of `kind`.
    pub fn free_count(&self, kind: usize) -> usize {
        self.free.get(kind).map_or(0, Vec::len)
    }

    /// Visuals built so far, pooled or live.
    pub fn constructed(&self) -> u32 {
        self.constructed
    }

    pub fn kinds(&self) -> usize {
        self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NoteKey, &NoteInstance)> {
        self.live.iter()
    }
}
