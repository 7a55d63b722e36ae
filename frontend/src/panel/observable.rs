// frontend/src/panel/observable.rs
//
// Live-updating state cell shared between the pipeline (writer) and the
// view side (readers). Notifications are synchronous and only fire when the
// stored value actually changes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Stores `value` and notifies every subscriber if it differs from the
    /// current one. Returns whether a change happened.
    pub fn set(&self, value: T) -> bool {
        let callbacks: Vec<Callback<T>> = {
            let mut shared = self.lock();
            if shared.value == value {
                return false;
            }
            shared.value = value.clone();
            shared
                .subscribers
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect()
        };

        // Lock is released here so callbacks are free to read the cell.
        for cb in callbacks {
            cb(&value);
        }
        true
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut shared = self.lock();
        let id = SubscriptionId(shared.next_id);
        shared.next_id += 1;
        shared.subscribers.push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut shared = self.lock();
        let before = shared.subscribers.len();
        shared.subscribers.retain(|(sid, _)| *sid != id);
        shared.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.lock().value)
            .finish_non_exhaustive()
    }
}
