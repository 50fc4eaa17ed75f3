//! Change notification fan-out for provider mutations.
//!
//! # Invariants
//! - Observers are called after the statement succeeded, outside the
//!   registry lock.
//! - Notification is fire-and-forget; observer failures never reach the
//!   mutating caller.

use super::address::ContentAddress;
use crossbeam::channel::{Receiver, Sender};
use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Receives the address touched by every successful mutation.
pub trait ContentObserver: Send + Sync {
    fn on_change(&self, address: &ContentAddress);
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Observer that forwards addresses into a channel.
pub struct ChannelObserver {
    sender: Sender<ContentAddress>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<ContentAddress>) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl ContentObserver for ChannelObserver {
    fn on_change(&self, address: &ContentAddress) {
        // A dropped receiver just means nobody listens anymore.
        let _ = self.sender.send(*address);
    }
}

/// Registry of observers interested in provider changes.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Mutex<BTreeMap<ObserverId, Arc<dyn ContentObserver>>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn ContentObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, observer);
        id
    }

    /// Returns whether the id was registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn notify_change(&self, address: &ContentAddress) {
        let observers: Vec<Arc<dyn ContentObserver>> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        debug!(
            "event=notify_change module=provider status=ok uri={address} observers={}",
            observers.len()
        );
        for observer in observers {
            observer.on_change(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeNotifier, ChannelObserver};
    use crate::provider::ContentAddress;
    use std::sync::Arc;

    #[test]
    fn registered_observers_receive_changes_until_unregistered() {
        let notifier = ChangeNotifier::new();
        let (observer, changes) = ChannelObserver::new();
        let id = notifier.register(Arc::new(observer));
        assert_eq!(notifier.observer_count(), 1);

        notifier.notify_change(&ContentAddress::Item(3));
        assert_eq!(changes.try_recv().unwrap(), ContentAddress::Item(3));

        assert!(notifier.unregister(id));
        assert!(!notifier.unregister(id));
        notifier.notify_change(&ContentAddress::Collection);
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_does_not_break_notification() {
        let notifier = ChangeNotifier::new();
        let (observer, changes) = ChannelObserver::new();
        notifier.register(Arc::new(observer));
        drop(changes);
        notifier.notify_change(&ContentAddress::Collection);
    }
}
