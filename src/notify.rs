//! Observer registry for synchronous change notification
//!
//! Channel metadata, source stream status and hub-level events all use the
//! same mechanism: an explicit subscribe/unsubscribe registry with
//! synchronous, in-order dispatch. There is no ambient event bus; every
//! notifier is owned by the component whose state it reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared observer callback
///
/// Observers are `Arc`ed closures so a single observer can be registered
/// with several notifiers (the channel hub observes its source stream this
/// way).
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Notifier::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Subscribe/unsubscribe registry with synchronous dispatch
///
/// Observers are invoked in subscription order, on the thread that calls
/// [`notify`](Notifier::notify), after the triggering state change is
/// already visible. The observer list is copied out before dispatch, so an
/// observer may subscribe or unsubscribe re-entrantly without deadlocking.
pub struct Notifier<T> {
    observers: Mutex<Vec<(u64, Observer<T>)>>,
    next_id: AtomicU64,
}

impl<T> Notifier<T> {
    /// Create an empty notifier
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an observer, returning a handle for later removal
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.subscribe_observer(Arc::new(observer))
    }

    /// Register an already-shared observer callback
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, observer));
        Subscription(id)
    }

    /// Remove a previously registered observer
    ///
    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(id, _)| *id != subscription.0);
        observers.len() != before
    }

    /// Dispatch an event to every registered observer, in order
    pub fn notify(&self, event: &T) {
        let observers: Vec<Observer<T>> =
            self.lock().iter().map(|(_, obs)| Arc::clone(obs)).collect();
        for observer in observers {
            observer(event);
        }
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Observer<T>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_notify_in_subscription_order() {
        let notifier = Notifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            notifier.subscribe(move |n: &u32| log.lock().unwrap().push((tag, *n)));
        }

        notifier.notify(&7);

        let log = log.lock().unwrap();
        assert_eq!(*log, vec![("first", 7), ("second", 7), ("third", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = Notifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = Arc::clone(&log);
        let sub = notifier.subscribe(move |n: &u32| log_a.lock().unwrap().push(*n));

        notifier.notify(&1);
        assert!(notifier.unsubscribe(sub));
        notifier.notify(&2);

        assert_eq!(*log.lock().unwrap(), vec![1]);
        // Second removal is a no-op
        assert!(!notifier.unsubscribe(sub));
    }

    #[test]
    fn test_reentrant_unsubscribe() {
        let notifier = Arc::new(Notifier::new());
        let count = Arc::new(Mutex::new(0u32));

        let sub_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let sub = {
            let notifier_in_observer = Arc::clone(&notifier);
            let count = Arc::clone(&count);
            let sub_slot = Arc::clone(&sub_slot);
            notifier.subscribe(move |_: &u32| {
                *count.lock().unwrap() += 1;
                if let Some(sub) = sub_slot.lock().unwrap().take() {
                    notifier_in_observer.unsubscribe(sub);
                }
            })
        };
        *sub_slot.lock().unwrap() = Some(sub);

        notifier.notify(&0);
        notifier.notify(&0);

        assert_eq!(*count.lock().unwrap(), 1);
    }
}
