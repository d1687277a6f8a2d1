//! In-process publish/subscribe for "a request came back 401".
//!
//! The fetch wrapper publishes; the redirect handler subscribes. Neither
//! knows about the other, they only share an `UnauthorizedBridge`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct BridgeInner {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler)>>,
}

/// Zero-payload signal channel. Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct UnauthorizedBridge {
    inner: Arc<BridgeInner>,
}

impl UnauthorizedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every current subscriber once, on the calling thread.
    ///
    /// With no subscribers the signal is dropped.
    pub fn publish(&self) {
        // Snapshot so handlers may subscribe or unsubscribe while running
        let handlers: Vec<Handler> = match self.inner.handlers.lock() {
            Ok(handlers) => handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            Err(_) => {
                warn!("Unauthorized bridge lock poisoned, dropping signal");
                return;
            }
        };

        debug!(subscribers = handlers.len(), "Publishing unauthorized signal");
        for handler in handlers {
            handler();
        }
    }

    /// Register `handler` until the returned `Subscription` is dropped or
    /// explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut handlers) = self.inner.handlers.lock() {
            handlers.push((id, Arc::new(handler)));
        }
        Subscription {
            id,
            bridge: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for UnauthorizedBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedBridge")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by `UnauthorizedBridge::subscribe`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bridge: Weak<BridgeInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn remove(&self) {
        let Some(inner) = self.bridge.upgrade() else {
            return;
        };
        let Ok(mut handlers) = inner.handlers.lock() else {
            return;
        };
        handlers.retain(|(id, _)| *id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bridge = UnauthorizedBridge::new();
        bridge.publish();

        // A late subscriber does not see earlier signals
        let (count, handler) = counter();
        let _sub = bridge.subscribe(handler);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_each_publish_notifies_once() {
        let bridge = UnauthorizedBridge::new();
        let (count, handler) = counter();
        let _sub = bridge.subscribe(handler);

        bridge.publish();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        bridge.publish();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let bridge = UnauthorizedBridge::new();
        let (count, handler) = counter();
        let sub = bridge.subscribe(handler);
        assert_eq!(bridge.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bridge.subscriber_count(), 0);
        bridge.publish();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_only_removes_own_handler() {
        let bridge = UnauthorizedBridge::new();
        let (first, h1) = counter();
        let (second, h2) = counter();
        let sub1 = bridge.subscribe(h1);
        let _sub2 = bridge.subscribe(h2);

        drop(sub1);
        bridge.publish();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bridge = UnauthorizedBridge::new();
        let publisher = bridge.clone();
        let (count, handler) = counter();
        let _sub = bridge.subscribe(handler);

        publisher.publish();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_bridge() {
        let bridge = UnauthorizedBridge::new();
        let (_count, handler) = counter();
        let sub = bridge.subscribe(handler);
        drop(bridge);
        sub.unsubscribe();
    }
}
