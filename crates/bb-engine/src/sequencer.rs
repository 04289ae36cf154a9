//! Music sequencer.
//!
//! Walks an ordered list of segments. Each segment's layers start together;
//! the primary layer's natural end (when it does not loop) moves the
//! sequence forward, as does an explicit skip. Waiting for completion is a
//! state field examined once per tick.
//!
//! A handoff planned for a future instant commits its audio early, within
//! the scheduler's lookahead, but the sequencer only enters the new segment
//! (cursor, beat clock, `SegmentAdvanced`) once the clock reaches it. Until
//! then the outgoing segment stays the active one.

use alloc::string::String;
use bb_ir::{
    ConfigError, DspTime, LayerAction, LayerRef, PlayError, SegmentDef, Sequence, SequenceDef,
    Signal, SignalQueue,
};
use log::{debug, info, warn};

use crate::backend::AudioBackend;
use crate::beat_clock::{BeatClock, Granularity};
use crate::layer::{Layer, LayerSet, LayerTable};
use crate::scheduler::LayerScheduler;

/// Lifecycle of a sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    /// No segment has started yet
    Idle,
    /// Segment at `index` is loaded
    SegmentActive { index: usize },
    /// Ran past the last segment; terminal
    Finished,
}

/// The active segment's primary layer, watched for its natural end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingCompletion {
    pub layer: LayerRef,
    /// Exact end of the primary clip when the backend knows its length
    pub expected_end: Option<DspTime>,
}

/// A skip waiting for a musical boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingAdvance {
    pub at: DspTime,
}

/// A segment whose audio is committed but whose start has not arrived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingEntry {
    /// Cursor position being entered; past the end means the sequence finishes
    pub index: usize,
    pub at: DspTime,
    /// `None` when the entry finishes the sequence
    clock: Option<BeatClock>,
}

/// Drives segment-to-segment progress of one sequence.
#[derive(Debug)]
pub struct MusicSequencer {
    sequence: Option<Sequence>,
    /// `None` before the first segment starts
    cursor: Option<usize>,
    state: SequencerState,
    layers: LayerTable,
    clock: Option<BeatClock>,
    completion: Option<PendingCompletion>,
    pending_advance: Option<PendingAdvance>,
    entering: Option<PendingEntry>,
    last_handoff: Option<DspTime>,
    signals: SignalQueue,
}

impl Default for MusicSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicSequencer {
    pub fn new() -> Self {
        Self {
            sequence: None,
            cursor: None,
            state: SequencerState::Idle,
            layers: LayerTable::new(),
            clock: None,
            completion: None,
            pending_advance: None,
            entering: None,
            last_handoff: None,
            signals: SignalQueue::new(),
        }
    }

    /// Validate `def` and begin its first segment at `now`.
    ///
    /// Anything still playing from an earlier sequence is cut.
    pub fn start<B: AudioBackend + ?Sized>(
        &mut self,
        def: &SequenceDef,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) -> Result<(), ConfigError> {
        let sequence = def.resolve()?;

        self.stop_all(now, scheduler, backend);
        info!("sequence started with {} segments", sequence.len());
        self.sequence = Some(sequence);
        self.cursor = None;
        self.state = SequencerState::Idle;
        self.last_handoff = None;
        self.transition(now, now, scheduler, backend);
        Ok(())
    }

    /// Cut to the next segment right now.
    pub fn advance<B: AudioBackend + ?Sized>(
        &mut self,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) -> Result<(), PlayError> {
        // A handoff already in flight is taken first, then cut
        self.enter();
        match self.state {
            SequencerState::SegmentActive { .. } => {
                self.transition(now, now, scheduler, backend);
                Ok(())
            }
            SequencerState::Finished => {
                warn!("advance ignored: sequence already finished");
                Err(PlayError::NotActive)
            }
            SequencerState::Idle => {
                warn!("advance ignored: no sequence started");
                Err(PlayError::NotActive)
            }
        }
    }

    /// Move to the next segment on the next beat or measure boundary of the
    /// active segment. Returns the boundary.
    ///
    /// While a handoff is in flight the boundary is taken from the incoming
    /// segment, strictly after its start.
    pub fn advance_on(&mut self, granularity: Granularity, now: DspTime) -> Result<DspTime, PlayError> {
        let (clock, from) = match self.entering {
            Some(entry) => (entry.clock, now.max(entry.at)),
            None => (self.clock, now),
        };
        let (SequencerState::SegmentActive { .. }, Some(clock)) = (self.state, clock) else {
            warn!("quantized advance ignored: no segment is active");
            return Err(PlayError::NotActive);
        };
        let at = clock.next_boundary(from, granularity);
        debug!("advance requested for {:.4}s", at.as_secs());
        self.pending_advance = Some(PendingAdvance { at });
        Ok(at)
    }

    /// Evaluate pending transitions once, then flush the scheduler.
    pub fn tick<B: AudioBackend + ?Sized>(
        &mut self,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) {
        backend.poll();
        self.enter_if_due(now);
        if self.entering.is_some() {
            self.flush(now, scheduler, backend);
            return;
        }
        let horizon = now + scheduler.lookahead();

        if let Some(pending) = self.pending_advance {
            if pending.at <= horizon {
                self.transition(pending.at.max(now), now, scheduler, backend);
                return;
            }
        }

        if let Some(completion) = self.completion {
            match completion.expected_end {
                Some(end) if end <= horizon => {
                    debug!("primary layer ends at {:.4}s", end.as_secs());
                    self.transition(end.max(now), now, scheduler, backend);
                    return;
                }
                _ => {
                    let running = self
                        .layers
                        .get(completion.layer)
                        .is_some_and(|layer| layer.is_sounding_at(now));
                    if running && !backend.is_playing(completion.layer) {
                        debug!("primary layer reported finished");
                        self.transition(now, now, scheduler, backend);
                        return;
                    }
                }
            }
        }

        self.flush(now, scheduler, backend);
    }

    /// Tear down the current segment and bring up the next, both at `at`.
    ///
    /// The audio is handed to the scheduler here; the segment itself is
    /// entered once `now` reaches `at`.
    fn transition<B: AudioBackend + ?Sized>(
        &mut self,
        at: DspTime,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) {
        self.completion = None;
        self.pending_advance = None;

        if let Some(previous) = self.cursor {
            scheduler.cancel_segment(previous);
            self.schedule_stops(previous, at, scheduler);
        }

        let next = self.cursor.map_or(0, |c| c + 1);

        let Some(def) = self.sequence.as_ref().and_then(|s| s.get(next)) else {
            self.entering = Some(PendingEntry { index: next, at, clock: None });
            self.enter_if_due(now);
            self.flush(now, scheduler, backend);
            return;
        };

        let set = LayerSet::load(next, def);
        for index in 0..set.layers.len() {
            scheduler.schedule(at, set.layer_ref(index), LayerAction::Start);
        }

        self.completion = def.primary_index().and_then(|primary| {
            let layer = &set.layers[primary];
            (!layer.looping).then(|| PendingCompletion {
                layer: set.layer_ref(primary),
                expected_end: backend.clip_duration(layer.clip).map(|d| at + d),
            })
        });

        debug!("segment #{} '{}' committed for {:.4}s", next, def.name, at.as_secs());
        let clock = BeatClock::new(def.tempo, at);
        self.entering = Some(PendingEntry { index: next, at, clock: Some(clock) });
        self.layers.insert(set);
        self.enter_if_due(now);
        self.flush(now, scheduler, backend);
    }

    fn enter_if_due(&mut self, now: DspTime) {
        if self.entering.is_some_and(|entry| entry.at <= now) {
            self.enter();
        }
    }

    /// Make the in-flight handoff, if any, the active segment.
    fn enter(&mut self) {
        let Some(entry) = self.entering.take() else {
            return;
        };
        self.cursor = Some(entry.index);
        self.last_handoff = Some(entry.at);

        let def = self.sequence.as_ref().and_then(|s| s.get(entry.index));
        let (Some(clock), Some(def)) = (entry.clock, def) else {
            info!("sequence finished at {:.4}s", entry.at.as_secs());
            self.state = SequencerState::Finished;
            self.clock = None;
            self.completion = None;
            self.signals.push(Signal::SequenceFinished);
            return;
        };
        info!(
            "segment #{} '{}' at {:.4}s ({} BPM, {} layers)",
            entry.index,
            def.name,
            entry.at.as_secs(),
            def.tempo.bpm(),
            def.layers.len()
        );
        self.clock = Some(clock);
        self.state = SequencerState::SegmentActive { index: entry.index };
        self.signals.push(Signal::SegmentAdvanced { index: entry.index, name: def.name });
    }

    fn schedule_stops(&mut self, segment: usize, at: DspTime, scheduler: &mut LayerScheduler) {
        let Some(set) = self.layers.set(segment) else {
            return;
        };
        for (index, layer) in set.layers.iter().enumerate() {
            if layer.is_active() {
                scheduler.schedule(at, set.layer_ref(index), LayerAction::Stop);
            }
        }
    }

    fn flush<B: AudioBackend + ?Sized>(
        &mut self,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) {
        scheduler.tick(now, backend, &mut self.layers);
        let keep = match (self.entering, self.state) {
            (Some(entry), _) => Some(entry.index),
            (None, SequencerState::SegmentActive { index }) => Some(index),
            _ => None,
        };
        self.layers.prune(keep);
    }

    /// Hard-stop everything this sequencer started.
    fn stop_all<B: AudioBackend + ?Sized>(
        &mut self,
        now: DspTime,
        scheduler: &mut LayerScheduler,
        backend: &mut B,
    ) {
        let segments: alloc::vec::Vec<usize> = self.layers.iter().map(|s| s.segment).collect();
        for segment in segments {
            scheduler.cancel_segment(segment);
            self.schedule_stops(segment, now, scheduler);
        }
        self.completion = None;
        self.pending_advance = None;
        self.entering = None;
        scheduler.tick(now, backend, &mut self.layers);
        self.layers.clear();
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SequencerState::Finished
    }

    /// Position in the sequence; `None` before the first segment.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn current_segment(&self) -> Option<&SegmentDef> {
        match self.state {
            SequencerState::SegmentActive { index } => self.sequence.as_ref()?.get(index),
            _ => None,
        }
    }

    /// Beat clock of the active segment, anchored at its start.
    pub fn clock(&self) -> Option<&BeatClock> {
        self.clock.as_ref()
    }

    /// Seconds since the active segment started.
    pub fn playback_time(&self, now: DspTime) -> Option<f64> {
        self.clock.map(|clock| clock.elapsed(now))
    }

    pub fn completion(&self) -> Option<&PendingCompletion> {
        self.completion.as_ref()
    }

    pub fn pending_advance(&self) -> Option<DspTime> {
        self.pending_advance.map(|p| p.at)
    }

    /// Handoff committed to the backend but not yet reached.
    pub fn pending_entry(&self) -> Option<&PendingEntry> {
        self.entering.as_ref()
    }

    /// Instant the most recent segment change (or the finish) took effect.
    pub fn last_handoff(&self) -> Option<DspTime> {
        self.last_handoff
    }

    /// Resolve a layer of the active segment by name.
    pub fn layer_ref(&self, name: &str) -> Result<LayerRef, ConfigError> {
        let (Some(segment), SequencerState::SegmentActive { index }) = (self.current_segment(), self.state)
        else {
            return Err(ConfigError::UnknownLayer { segment: String::new(), layer: String::from(name) });
        };
        segment
            .layer_index(name)
            .map(|layer| LayerRef::new(index, layer))
            .ok_or_else(|| ConfigError::UnknownLayer {
                segment: String::from(segment.name.as_str()),
                layer: String::from(name),
            })
    }

    pub fn layer(&self, layer: LayerRef) -> Option<&Layer> {
        self.layers.get(layer)
    }

    pub fn layers(&self) -> &LayerTable {
        &self.layers
    }

    pub fn signals(&mut self) -> &mut SignalQueue {
        &mut self.signals
    }
}
