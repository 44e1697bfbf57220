use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::container::ContainerID;
use crate::stats::DerivedMetric;

/// Opaque identity of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberHandle(u64);

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One observer's delivery channel and the container it follows.
#[derive(Debug, Clone)]
pub struct Subscriber {
    container_id: ContainerID,
    channel: mpsc::Sender<DerivedMetric>,
}

impl Subscriber {
    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }

    pub fn channel(&self) -> &mpsc::Sender<DerivedMetric> {
        &self.channel
    }
}

/// The set of active subscribers.
///
/// All operations take the same lock, so no caller ever observes a partial update.
/// A registered channel stays open at least until its entry is unregistered.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    subscribers: BTreeMap<SubscriberHandle, Subscriber>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The map is never left half-updated, so a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(
        &self,
        container_id: ContainerID,
        channel: mpsc::Sender<DerivedMetric>,
    ) -> SubscriberHandle {
        let mut inner = self.lock();
        let handle = SubscriberHandle(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.insert(
            handle,
            Subscriber {
                container_id,
                channel,
            },
        );
        handle
    }

    /// Removes a subscriber. Returns `false` if it was not registered (anymore).
    pub fn unregister(&self, handle: SubscriberHandle) -> bool {
        // drop the channel outside of the lock
        let removed = self.lock().subscribers.remove(&handle);
        removed.is_some()
    }

    /// Returns the subscribers registered at this instant, in registration order.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.lock().subscribers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
