// Per-key single-slot delayed task scheduler

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct Slot {
    seq: u64,
    handle: JoinHandle<()>,
}

/// Schedule-or-replace debouncing: each key holds at most one pending
/// task, and scheduling again before the delay elapses cancels the
/// previous one. Once the delay has elapsed the task deregisters itself
/// before running, so a later `schedule` can no longer cancel a body
/// that is already in flight.
#[derive(Clone)]
pub struct KeyedDebouncer {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    next_seq: Arc<AtomicU64>,
}

impl KeyedDebouncer {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: &str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let slots = Arc::clone(&self.slots);
        let task_key = key.to_string();

        // Hold the lock across the spawn so the new slot is registered
        // before the task can deregister itself.
        let mut guard = self.slots.lock();
        if let Some(prev) = guard.remove(key) {
            prev.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut guard = slots.lock();
                if guard.get(&task_key).map(|slot| slot.seq) == Some(seq) {
                    guard.remove(&task_key);
                }
            }
            task.await;
        });

        guard.insert(key.to_string(), Slot { seq, handle });
    }

    pub fn cancel(&self, key: &str) {
        if let Some(slot) = self.slots.lock().remove(key) {
            slot.handle.abort();
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.slots.lock().contains_key(key)
    }
}

impl Default for KeyedDebouncer {
    fn default() -> Self {
        Self::new()
    }
}
