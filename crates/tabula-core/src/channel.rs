//! Synchronous publish/subscribe channel
//!
//! `publish` snapshots the handler list before dispatch, so a handler may
//! subscribe or unsubscribe (itself included) without affecting the dispatch in
//! progress. Handlers run in registration order and complete before `publish`
//! returns; nothing is queued for late subscribers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback invoked for each published value
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Token returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub struct Channel<T> {
    name: &'static str,
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> Channel<T> {
    /// Create a channel; `name` only labels log output
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler for every subsequent publish
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler<T> = Arc::new(handler);
        self.lock().push((id, handler));
        tracing::trace!(channel = self.name, subscription = %id, "subscribed");
        id
    }

    /// Remove a handler; returns false when the id was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        let removed = handlers.len() != before;
        tracing::trace!(channel = self.name, subscription = %id, removed, "unsubscribed");
        removed
    }

    /// Deliver `value` to every handler registered at the time of the call
    pub fn publish(&self, value: &T) {
        let snapshot: Vec<Handler<T>> = self.lock().iter().map(|(_, h)| h.clone()).collect();
        tracing::debug!(
            channel = self.name,
            subscriber_count = snapshot.len(),
            "publish"
        );
        for handler in snapshot {
            handler(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    // A handler that panicked mid-registration leaves the list itself intact
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Handler<T>)>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&u32) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |label: &str| {
            let sink = sink.clone();
            let label = label.to_string();
            Box::new(move |v: &u32| sink.lock().unwrap().push(format!("{}:{}", label, v)))
                as Box<dyn Fn(&u32) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn test_publish_in_registration_order() {
        let channel = Channel::new("test");
        let (log, make) = recorder();
        channel.subscribe(make("a"));
        channel.subscribe(make("b"));

        channel.publish(&1);
        channel.publish(&2);

        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "a:2", "b:2"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let channel = Channel::new("test");
        let (log, make) = recorder();
        let a = channel.subscribe(make("a"));
        channel.subscribe(make("b"));

        assert!(channel.unsubscribe(a));
        assert!(!channel.unsubscribe(a));
        channel.publish(&7);

        assert_eq!(*log.lock().unwrap(), vec!["b:7"]);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_publish() {
        let channel = Channel::new("test");
        let (log, make) = recorder();
        channel.publish(&1);
        channel.subscribe(make("late"));
        channel.publish(&2);

        assert_eq!(*log.lock().unwrap(), vec!["late:2"]);
    }

    #[test]
    fn test_subscribe_during_dispatch_uses_snapshot() {
        let channel = Arc::new(Channel::<u32>::new("test"));
        let hits = Arc::new(AtomicU64::new(0));

        let inner_channel = channel.clone();
        let inner_hits = hits.clone();
        channel.subscribe(move |_| {
            let hits = inner_hits.clone();
            inner_channel.subscribe(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        });

        channel.publish(&1);
        // Handler added during the first dispatch did not run for it
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(channel.subscriber_count(), 2);

        channel.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_self_during_dispatch() {
        let channel = Arc::new(Channel::<u32>::new("test"));
        let (log, make) = recorder();
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let inner_channel = channel.clone();
        let inner_id = own_id.clone();
        let id = channel.subscribe(move |_| {
            if let Some(id) = *inner_id.lock().unwrap() {
                inner_channel.unsubscribe(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);
        channel.subscribe(make("b"));

        channel.publish(&1);
        channel.publish(&2);

        // The second handler still ran during the dispatch that removed the first
        assert_eq!(*log.lock().unwrap(), vec!["b:1", "b:2"]);
        assert_eq!(channel.subscriber_count(), 1);
    }
}
