//! Watcher events and the in-process event bus
//!
//! Handlers are registered per [`EventKind`] and invoked synchronously, in
//! registration order, at the moment an event is emitted.

use crate::snapshot::Entry;
use dashmap::DashMap;
use pollwatch_core::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The four event kinds a watcher emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Error,
    Add,
    Change,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [Self::Ready, Self::Error, Self::Add, Self::Change];
}

/// An event with its kind-specific payload
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The first collect finished
    Ready,
    /// Something failed; see [`Error`]
    Error(Arc<Error>),
    /// A file was seen for the first time
    Add(Entry),
    /// A known file has a newer modification time
    Change { updated: Entry, previous: Entry },
}

impl WatchEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready => EventKind::Ready,
            Self::Error(_) => EventKind::Error,
            Self::Add(_) => EventKind::Add,
            Self::Change { .. } => EventKind::Change,
        }
    }

    /// The path this event is about, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Ready => None,
            Self::Error(err) => err.path(),
            Self::Add(entry) => Some(&entry.path),
            Self::Change { updated, .. } => Some(&updated.path),
        }
    }
}

type Handler = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

/// One registration on the bus
#[derive(Clone)]
enum Subscriber {
    Handler(Handler),
    /// Forwards into a channel; dropped once the receiver is gone
    Channel(mpsc::UnboundedSender<WatchEvent>),
}

impl Subscriber {
    fn is_live(&self) -> bool {
        match self {
            Self::Handler(_) => true,
            Self::Channel(tx) => !tx.is_closed(),
        }
    }

    fn deliver(&self, event: &WatchEvent) {
        match self {
            Self::Handler(handler) => handler(event),
            Self::Channel(tx) => {
                // Receiver may close between the liveness check and the send
                let _ = tx.send(event.clone());
            }
        }
    }
}

/// Typed publish/subscribe keyed by event kind
#[derive(Default)]
pub struct EventBus {
    subscribers: DashMap<EventKind, Vec<Subscriber>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .subscribers
            .iter()
            .map(|s| (*s.key(), s.value().len()))
            .collect();
        counts.sort_by_key(|(kind, _)| *kind as u8);
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Subscriber::Handler(Arc::new(handler)));
    }

    pub fn on_ready<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Ready, move |_| handler());
    }

    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Error, move |event| {
            if let WatchEvent::Error(err) = event {
                handler(err);
            }
        });
    }

    pub fn on_add<F>(&self, handler: F)
    where
        F: Fn(&Entry) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Add, move |event| {
            if let WatchEvent::Add(entry) = event {
                handler(entry);
            }
        });
    }

    /// Handler receives `(updated, previous)`
    pub fn on_change<F>(&self, handler: F)
    where
        F: Fn(&Entry, &Entry) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::Change, move |event| {
            if let WatchEvent::Change { updated, previous } = event {
                handler(updated, previous);
            }
        });
    }

    /// Forward every event kind into an unbounded channel
    ///
    /// While the receiver is alive it counts as an error subscriber, so fatal
    /// errors are delivered on the channel instead of being returned to the
    /// caller. Dropping the receiver unregisters it.
    pub fn channel(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in EventKind::ALL {
            self.prune(kind);
            self.subscribers
                .entry(kind)
                .or_default()
                .push(Subscriber::Channel(tx.clone()));
        }
        rx
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.prune(kind);
        self.subscribers
            .get(&kind)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
    }

    /// Number of live registrations for one kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.prune(kind);
        self.subscribers.get(&kind).map(|s| s.len()).unwrap_or(0)
    }

    /// Invoke the subscribers registered for the event's kind
    pub fn emit(&self, event: WatchEvent) {
        let kind = event.kind();
        self.prune(kind);
        // Snapshot the list so handlers may subscribe re-entrantly
        let subscribers = match self.subscribers.get(&kind) {
            Some(subscribers) => subscribers.clone(),
            None => return,
        };
        for subscriber in subscribers {
            subscriber.deliver(&event);
        }
    }

    /// Remove channel subscribers whose receiver was dropped
    fn prune(&self, kind: EventKind) {
        if let Some(mut subscribers) = self.subscribers.get_mut(&kind) {
            subscribers.retain(Subscriber::is_live);
        }
    }
}
