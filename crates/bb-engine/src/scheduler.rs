//! Layer event scheduling.
//!
//! Events wait in a time-ordered queue until they fall within the lookahead
//! margin. Then they are either realized on the spot (fire time already
//! reached) or handed to the backend's own future scheduling, so the start
//! lands on the exact instant regardless of how coarse the tick loop is.

use alloc::string::String;
use bb_ir::{DspTime, EventId, LayerAction, LayerRef, PlayError, ScheduledEvent};
use log::{debug, warn};

use crate::backend::AudioBackend;
use crate::error::EngineError;
use crate::event_queue::EventQueue;
use crate::layer::LayerTable;

/// Scheduler tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// How far ahead of its fire time an event is handed to the backend,
    /// in seconds
    pub lookahead: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { lookahead: 0.1 }
    }
}

/// Counters kept across the scheduler's lifetime.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchedulerStats {
    /// Events applied immediately
    pub realized: u64,
    /// Events committed to the backend for a future instant
    pub committed: u64,
    /// Events first examined after their fire time
    pub misses: u64,
    /// Starts skipped because the layer was already playing
    pub duplicate_starts: u64,
    /// Events whose layer was torn down before they fired
    pub orphaned: u64,
    /// Backend rejections
    pub backend_errors: u64,
    /// The most recent failure, if any
    pub last_error: Option<EngineError>,
}

/// Turns (time, action) requests into backend commands.
#[derive(Debug, Default)]
pub struct LayerScheduler {
    config: SchedulerConfig,
    queue: EventQueue,
    next_id: u64,
    stats: SchedulerStats,
}

impl LayerScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            queue: EventQueue::new(),
            next_id: 0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn lookahead(&self) -> f64 {
        self.config.lookahead
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Queue an action for `target` at `fire_time`.
    pub fn schedule(&mut self, fire_time: DspTime, target: LayerRef, action: LayerAction) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        debug!("schedule {:?} {:?} at {:.4}s", target, action, fire_time.as_secs());
        self.queue.push(ScheduledEvent::new(id, fire_time, target, action));
        id
    }

    /// Change the target volume of a pending ramp, keeping its fire time.
    ///
    /// Returns false when the event is no longer pending or is not a ramp.
    pub fn retarget(&mut self, id: EventId, volume: f32) -> bool {
        let duration = match self.queue.get(id).map(|e| e.action) {
            Some(LayerAction::RampVolume { duration, .. }) => duration,
            _ => return false,
        };
        self.queue.retarget(id, LayerAction::RampVolume { target: volume, duration })
    }

    pub fn cancel(&mut self, id: EventId) -> bool {
        self.queue.cancel(id).is_some()
    }

    /// Drop every pending event of one played segment.
    pub fn cancel_segment(&mut self, segment: usize) -> usize {
        let dropped = self.queue.cancel_segment(segment);
        if dropped > 0 {
            debug!("cancelled {} pending events of segment #{}", dropped, segment);
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn is_pending(&self, id: EventId) -> bool {
        self.queue.contains(id)
    }

    pub fn pending(&self, id: EventId) -> Option<&ScheduledEvent> {
        self.queue.get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Hand every event within the lookahead to the backend, then bring
    /// layer state up to `now`. Returns the number of events dispatched.
    pub fn tick<B: AudioBackend + ?Sized>(
        &mut self,
        now: DspTime,
        backend: &mut B,
        layers: &mut LayerTable,
    ) -> usize {
        let horizon = now + self.config.lookahead;
        let mut dispatched = 0;
        while let Some(event) = self.queue.pop_due(horizon) {
            if let Err(err) = self.dispatch(&event, now, backend, layers) {
                self.stats.last_error = Some(err);
            }
            dispatched += 1;
        }
        layers.update(now);
        dispatched
    }

    fn dispatch<B: AudioBackend + ?Sized>(
        &mut self,
        event: &ScheduledEvent,
        now: DspTime,
        backend: &mut B,
        layers: &mut LayerTable,
    ) -> Result<(), EngineError> {
        let Some(layer) = layers.get_mut(event.target) else {
            self.stats.orphaned += 1;
            debug!("dropping {:?}: layer {:?} is gone", event.action, event.target);
            return Ok(());
        };

        let at = if event.fire_time > now {
            self.stats.committed += 1;
            Some(event.fire_time)
        } else {
            if event.fire_time < now {
                self.stats.misses += 1;
                warn!(
                    "scheduling miss: {:?} for {:?} was due at {:.4}s, realized at {:.4}s",
                    event.action,
                    event.target,
                    event.fire_time.as_secs(),
                    now.as_secs()
                );
            }
            self.stats.realized += 1;
            None
        };
        let effective = at.unwrap_or(now);

        match event.action {
            LayerAction::Start => {
                if layer.is_active() {
                    self.stats.duplicate_starts += 1;
                    warn!("layer '{}' is already playing, start skipped", layer.name);
                    return Err(PlayError::AlreadyPlaying(String::from(layer.name.as_str())).into());
                }
                let volume = layer.target_volume();
                backend
                    .start(event.target, layer.clip, volume, layer.looping, at)
                    .map_err(|err| {
                        self.stats.backend_errors += 1;
                        warn!("backend refused to start layer '{}': {}", layer.name, err);
                        EngineError::from(err)
                    })?;
                layer.mark_started(effective, now);
            }
            LayerAction::Stop => {
                backend.stop(event.target, at).map_err(|err| {
                    self.stats.backend_errors += 1;
                    warn!("backend refused to stop layer '{}': {}", layer.name, err);
                    EngineError::from(err)
                })?;
                layer.mark_stopped(effective, now);
            }
            LayerAction::RampVolume { target, duration } => {
                backend.ramp(event.target, target, duration, at).map_err(|err| {
                    self.stats.backend_errors += 1;
                    warn!("backend refused to ramp layer '{}': {}", layer.name, err);
                    EngineError::from(err)
                })?;
                layer.begin_ramp(effective, target, duration);
            }
        }
        Ok(())
    }
}
