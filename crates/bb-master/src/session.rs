//! The composition root.
//!
//! A `Session` owns one clock/backend pair and every tick-side component:
//! scheduler, sequencer, volume controller and note timeline. Each `tick`
//! reads the clock once, lets the sequencer act, moves the timeline and
//! routes whatever signals were raised.

use std::collections::BTreeMap;

use bb_chart::LoadedSequence;
use bb_engine::{
    AudioBackend, BeatClock, ClockSource, Granularity, Judgment, LayerScheduler,
    LayerVolumeController, MusicSequencer, NoteTimeline, VolumeRequest,
};
use bb_ir::{ConfigError, DspTime, EventNote, PlayError, SequenceDef, Signal, SignalKind};
use log::{debug, info, warn};

use crate::combo::ComboLayering;
use crate::config::SessionConfig;
use crate::router::{SignalRouter, SignalSink, SubscriberId};
use crate::score::Scoreboard;
use crate::SessionError;

pub struct Session<B> {
    backend: B,
    scheduler: LayerScheduler,
    sequencer: MusicSequencer,
    volume: LayerVolumeController,
    timeline: NoteTimeline,
    definition: SequenceDef,
    charts: BTreeMap<String, Vec<EventNote>>,
    router: SignalRouter,
    scoreboard: Scoreboard,
    combo: Option<ComboLayering>,
    /// Start of the segment the timeline's chart belongs to
    segment_start: Option<DspTime>,
    inbox: Vec<Signal>,
}

impl<B: AudioBackend + ClockSource> Session<B> {
    /// Validate `loaded` and wire the components around `backend`.
    pub fn new(backend: B, loaded: LoadedSequence, config: SessionConfig) -> Result<Self, SessionError> {
        loaded.sequence.resolve()?;
        let timeline = NoteTimeline::new(config.timeline)?;
        Ok(Self {
            backend,
            scheduler: LayerScheduler::new(config.scheduler),
            sequencer: MusicSequencer::new(),
            volume: LayerVolumeController::new(config.volume),
            timeline,
            definition: loaded.sequence,
            charts: loaded.charts,
            router: SignalRouter::new(),
            scoreboard: Scoreboard::new(),
            combo: config.combo.map(ComboLayering::new),
            segment_start: None,
            inbox: Vec::new(),
        })
    }

    pub fn now(&self) -> DspTime {
        self.backend.now()
    }

    /// Begin the first segment now. Restarting cuts whatever is playing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let now = self.backend.now();
        self.sequencer.start(&self.definition, now, &mut self.scheduler, &mut self.backend)?;
        self.dispatch(now);
        Ok(())
    }

    /// Run one pass of the tick loop.
    pub fn tick(&mut self) {
        let now = self.backend.now();
        self.sequencer.tick(now, &mut self.scheduler, &mut self.backend);
        self.dispatch(now);
    }

    /// Cut to the next segment immediately.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        let now = self.backend.now();
        self.sequencer.advance(now, &mut self.scheduler, &mut self.backend)?;
        self.dispatch(now);
        Ok(())
    }

    /// Move to the next segment on the next beat or measure boundary.
    pub fn advance_on(&mut self, granularity: Granularity) -> Result<DspTime, SessionError> {
        Ok(self.sequencer.advance_on(granularity, self.backend.now())?)
    }

    /// Fade layer `name` of the active segment to `target` on the next
    /// measure boundary.
    pub fn set_layer_target(&mut self, name: &str, target: f32) -> Result<VolumeRequest, SessionError> {
        let now = self.backend.now();
        Ok(self
            .volume
            .set_layer_target(name, target, now, &self.sequencer, &mut self.scheduler)?)
    }

    /// Strike `lane` now.
    pub fn hit(&mut self, lane: usize) -> Result<Judgment, SessionError> {
        let now = self.backend.now();
        let time = self.sequencer.playback_time(now).ok_or(PlayError::NotActive)?;
        self.judge_at(lane, time)
    }

    /// Strike `lane` at `playback_time` seconds into the active segment.
    pub fn judge_at(&mut self, lane: usize, playback_time: f64) -> Result<Judgment, SessionError> {
        let judgment = self.timeline.judge(lane, playback_time)?;
        let now = self.backend.now();
        self.inbox.extend(self.timeline.signals().drain());
        self.deliver_inbox(now);
        Ok(judgment)
    }

    pub fn subscribe(&mut self, kinds: &[SignalKind], sink: Box<dyn SignalSink>) -> SubscriberId {
        self.router.subscribe(kinds, sink)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.router.unsubscribe(id)
    }

    fn dispatch(&mut self, now: DspTime) {
        // Sequencer first, so a new segment's chart is in place before the
        // timeline moves
        let signals: Vec<Signal> = self.sequencer.signals().drain().collect();
        if signals
            .iter()
            .any(|s| matches!(s, Signal::SegmentAdvanced { .. } | Signal::SequenceFinished))
        {
            self.close_chart();
        }
        self.inbox.extend(signals);
        self.deliver_inbox(now);
        self.segment_start = self.sequencer.clock().map(BeatClock::segment_start);

        if let Some(time) = self.sequencer.playback_time(now) {
            self.timeline.advance(time);
            self.inbox.extend(self.timeline.signals().drain());
            self.deliver_inbox(now);
        }
        self.volume.prune(now, &self.sequencer, &self.scheduler);
    }

    /// Resolve the outgoing chart up to the handoff instant, so its
    /// unjudged notes miss ahead of the segment change.
    fn close_chart(&mut self) {
        let (Some(start), Some(end)) = (self.segment_start, self.sequencer.last_handoff()) else {
            return;
        };
        self.timeline.expire_through(end - start);
        self.inbox.extend(self.timeline.signals().drain());
    }

    fn deliver_inbox(&mut self, now: DspTime) {
        let mut inbox = std::mem::take(&mut self.inbox);
        for signal in inbox.drain(..) {
            self.deliver(&signal, now);
        }
        self.inbox = inbox;
    }

    fn deliver(&mut self, signal: &Signal, now: DspTime) {
        match signal {
            Signal::SegmentAdvanced { name, .. } => {
                let notes = self.charts.get(name.as_str()).map_or(&[][..], Vec::as_slice);
                let kept = self.timeline.load_segment_notes(notes);
                info!("segment '{}': {} notes", name, kept);
            }
            Signal::SequenceFinished => {
                self.timeline.load_segment_notes(&[]);
            }
            _ => {}
        }

        self.scoreboard.record(signal);
        self.router.route(signal);
        self.apply_combo(signal, now);
    }

    fn apply_combo(&mut self, signal: &Signal, now: DspTime) {
        let Some(combo) = self.combo.as_mut() else {
            return;
        };
        let change = combo.observe(signal);
        if change.is_empty() {
            return;
        }
        let Some(segment) = self.sequencer.current_segment() else {
            return;
        };
        if !segment.layering {
            debug!("layering disabled in '{}', combo change dropped", segment.name);
            return;
        }

        for (name, target) in combo.requests(change) {
            match self
                .volume
                .set_layer_target(name, target, now, &self.sequencer, &mut self.scheduler)
            {
                Ok(request) => debug!("combo: '{}' -> {:.1} ({:?})", name, target, request),
                Err(bb_engine::EngineError::Config(ConfigError::UnknownLayer { .. })) => {
                    debug!("combo: no layer '{}' in this segment", name);
                }
                Err(err) => warn!("combo: '{}' -> {:.1} failed: {}", name, target, err),
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    /// Seconds into the active segment.
    pub fn playback_time(&self) -> Option<f64> {
        self.sequencer.playback_time(self.backend.now())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn sequencer(&self) -> &MusicSequencer {
        &self.sequencer
    }

    pub fn scheduler(&self) -> &LayerScheduler {
        &self.scheduler
    }

    pub fn volume(&self) -> &LayerVolumeController {
        &self.volume
    }

    pub fn timeline(&self) -> &NoteTimeline {
        &self.timeline
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn combo(&self) -> Option<&ComboLayering> {
        self.combo.as_ref()
    }

    /// Total notes across every segment's chart.
    pub fn chart_len(&self) -> usize {
        self.charts.values().map(Vec::len).sum()
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl<B> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.sequencer.state())
            .field("scoreboard", &self.scoreboard)
            .finish_non_exhaustive()
    }
}
