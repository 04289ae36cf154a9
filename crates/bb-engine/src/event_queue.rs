//! Priority queue for scheduled layer events.

use alloc::vec::Vec;
use bb_ir::{DspTime, EventId, LayerAction, ScheduledEvent};

/// A priority queue of events sorted by fire time.
///
/// Events with equal fire times keep their submission order: inserts land
/// after every event that fires at or before the new one.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<ScheduledEvent>,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event into the queue.
    pub fn push(&mut self, event: ScheduledEvent) {
        let pos = self.events.partition_point(|e| e.fire_time <= event.fire_time);
        self.events.insert(pos, event);
    }

    /// Peek at the next event without removing it.
    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.events.first()
    }

    /// Pop the next event if it fires at or before `horizon`.
    pub fn pop_due(&mut self, horizon: DspTime) -> Option<ScheduledEvent> {
        match self.events.first() {
            Some(event) if event.fire_time <= horizon => Some(self.events.remove(0)),
            _ => None,
        }
    }

    /// Look up a pending event.
    pub fn get(&self, id: EventId) -> Option<&ScheduledEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Whether the event is still waiting.
    pub fn contains(&self, id: EventId) -> bool {
        self.get(id).is_some()
    }

    /// Replace a pending event's action, keeping its fire time and position.
    ///
    /// Returns false if the event has already left the queue.
    pub fn retarget(&mut self, id: EventId, action: LayerAction) -> bool {
        match self.events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                event.action = action;
                true
            }
            None => false,
        }
    }

    /// Remove a pending event.
    pub fn cancel(&mut self, id: EventId) -> Option<ScheduledEvent> {
        let pos = self.events.iter().position(|e| e.id == id)?;
        Some(self.events.remove(pos))
    }

    /// Remove every pending event aimed at layers of the given segment
    /// cursor. Returns how many were dropped.
    pub fn cancel_segment(&mut self, segment: usize) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.target.segment != segment);
        before - self.events.len()
    }

    /// Clear all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_ir::LayerRef;

    fn event(id: u64, at: f64, layer: usize) -> ScheduledEvent {
        ScheduledEvent::new(EventId(id), DspTime::from_secs(at), LayerRef::new(0, layer), LayerAction::Start)
    }

    #[test]
    fn event_ordering() {
        let mut queue = EventQueue::new();
        queue.push(event(1, 10.0, 0));
        queue.push(event(2, 5.0, 0));
        queue.push(event(3, 15.0, 0));

        let horizon = DspTime::from_secs(100.0);
        assert_eq!(queue.pop_due(horizon).unwrap().id, EventId(2));
        assert_eq!(queue.pop_due(horizon).unwrap().id, EventId(1));
        assert_eq!(queue.pop_due(horizon).unwrap().id, EventId(3));
        assert!(queue.pop_due(horizon).is_none());
    }

    #[test]
    fn equal_times_fire_in_submission_order() {
        let mut queue = EventQueue::new();
        queue.push(event(1, 2.0, 0));
        queue.push(event(2, 1.0, 0));
        queue.push(event(3, 2.0, 1));
        queue.push(event(4, 2.0, 2));

        let ids: Vec<u64> = core::iter::from_fn(|| queue.pop_due(DspTime::from_secs(2.0)))
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, [2, 1, 3, 4]);
    }

    #[test]
    fn pop_due_respects_horizon() {
        let mut queue = EventQueue::new();
        queue.push(event(1, 1.0, 0));
        queue.push(event(2, 3.0, 0));

        assert!(queue.pop_due(DspTime::from_secs(0.5)).is_none());
        assert_eq!(queue.pop_due(DspTime::from_secs(1.0)).unwrap().id, EventId(1));
        assert!(queue.pop_due(DspTime::from_secs(2.9)).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn retarget_keeps_fire_time() {
        let mut queue = EventQueue::new();
        queue.push(event(1, 2.0, 0));
        let ramp = LayerAction::RampVolume { target: 0.0, duration: 0.2 };

        assert!(queue.retarget(EventId(1), ramp));
        let e = queue.peek().unwrap();
        assert_eq!(e.fire_time, DspTime::from_secs(2.0));
        assert_eq!(e.action, ramp);
        assert!(!queue.retarget(EventId(9), ramp));
    }

    #[test]
    fn cancel_segment_drops_only_that_segment() {
        let mut queue = EventQueue::new();
        queue.push(event(1, 1.0, 0));
        queue.push(ScheduledEvent::new(EventId(2), DspTime::from_secs(1.0), LayerRef::new(1, 0), LayerAction::Stop));

        assert_eq!(queue.cancel_segment(0), 1);
        assert!(!queue.contains(EventId(1)));
        assert!(queue.contains(EventId(2)));
        assert!(queue.cancel(EventId(2)).is_some());
        assert!(queue.is_empty());
    }
}
