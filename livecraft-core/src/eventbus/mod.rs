//! src/eventbus/mod.rs
//!
//! In-process event bus. Every subscriber gets its own bounded MPSC queue,
//! filtered by topic (one event name, or all of them). One-shot
//! subscriptions are dropped from the bus right after their first delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch, Mutex};

use livecraft_common::models::{ActionEnvelope, LiveEvent, StoreNotification};

/// Everything that travels over the bus.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A store write committed.
    Store(StoreNotification),

    /// An event from the live platform.
    Live(LiveEvent),

    /// The dispatcher emitted an `"actions"` message.
    ActionEmitted(ActionEnvelope),

    SystemMessage(String),
}

impl BusEvent {
    /// The name subscribers filter on.
    pub fn name(&self) -> &str {
        match self {
            BusEvent::Store(n) => n.op.as_str(),
            BusEvent::Live(ev) => ev.kind.as_str(),
            BusEvent::ActionEmitted(_) => "actions",
            BusEvent::SystemMessage(_) => "system_message",
        }
    }
}

/// Which events a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    All,
    Named(String),
}

impl Topic {
    pub fn named(name: &str) -> Self {
        Topic::Named(name.to_string())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Topic::All => true,
            Topic::Named(n) => n == name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    topic: Topic,
    once: bool,
    tx: mpsc::Sender<BusEvent>,
}

/// Receiving end of a subscription. Dropping it detaches the subscriber
/// on the next publish.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<BusEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }
}

/// - If a subscriber's buffer fills, `publish` waits until there's space
///   (backpressure).
/// - If a subscriber dropped its receiver, it is removed.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
const DEFAULT_BUFFER_SIZE: usize = 10000;

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            next_id: Arc::new(AtomicU64::new(0)),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    async fn add(&self, topic: Topic, once: bool, buffer_size: usize) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        self.subscribers.lock().await.push(Subscriber { id, topic, once, tx });
        Subscription { id, rx }
    }

    /// Subscribe to one topic.
    pub async fn subscribe(&self, topic: Topic, buffer_size: Option<usize>) -> Subscription {
        self.add(topic, false, buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)).await
    }

    /// Subscribe to every event on the bus.
    pub async fn subscribe_all(&self, buffer_size: Option<usize>) -> Subscription {
        self.subscribe(Topic::All, buffer_size).await
    }

    /// Receives at most one event matching `topic`.
    pub async fn once(&self, topic: Topic) -> Subscription {
        self.add(topic, true, 1).await
    }

    /// Returns false when the id was not (or no longer) subscribed.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.lock().await;
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Publish an event to all matching subscribers. Returns how many
    /// received it.
    pub async fn publish(&self, event: BusEvent) -> usize {
        let targets: Vec<(SubscriptionId, mpsc::Sender<BusEvent>)> = {
            let mut subs = self.subscribers.lock().await;
            let name = event.name();
            let targets = subs
                .iter()
                .filter(|s| s.topic.matches(name))
                .map(|s| (s.id, s.tx.clone()))
                .collect();
            // one-shot subscribers leave before delivery so a concurrent
            // publish can't hand them a second event
            subs.retain(|s| !(s.once && s.topic.matches(name)));
            targets
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in targets {
            match tx.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            self.subscribers.lock().await.retain(|s| !closed.contains(&s.id));
        }
        delivered
    }

    /// Convenience method: publish a live platform event.
    pub async fn publish_live(&self, event: LiveEvent) -> usize {
        self.publish(BusEvent::Live(event)).await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
