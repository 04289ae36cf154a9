//! Signal fan-out.

use bb_ir::{Signal, SignalKind};
use log::debug;

/// Receives the signals it subscribed to.
pub trait SignalSink {
    fn on_signal(&mut self, signal: &Signal);
}

impl<F: FnMut(&Signal)> SignalSink for F {
    fn on_signal(&mut self, signal: &Signal) {
        self(signal)
    }
}

impl SignalSink for std::sync::mpsc::Sender<Signal> {
    fn on_signal(&mut self, signal: &Signal) {
        let _ = self.send(signal.clone());
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u32);

struct Subscription {
    id: SubscriberId,
    kinds: Vec<SignalKind>,
    sink: Box<dyn SignalSink>,
}

/// Delivers each signal to every subscriber of its kind, in subscription
/// order.
#[derive(Default)]
pub struct SignalRouter {
    subscriptions: Vec<Subscription>,
    next_id: u32,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kinds: &[SignalKind], sink: Box<dyn SignalSink>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        debug!("subscriber {:?} for {:?}", id, kinds);
        self.subscriptions.push(Subscription { id, kinds: kinds.to_vec(), sink });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn route(&mut self, signal: &Signal) {
        let kind = signal.kind();
        for subscription in &mut self.subscriptions {
            if subscription.kinds.contains(&kind) {
                subscription.sink.on_signal(signal);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for SignalRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRouter")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
