//! Per-session serialization of aggregate mutations.
//!
//! Session counters (`total_turns`, `last_activity_at`) and turn rollups are
//! touched by the synchronous request path and by concurrent background
//! runs. Every such read-modify-write goes through the per-session lock
//! handed out here, giving the single-writer discipline that prevents lost
//! updates when two runs for the same turn complete concurrently.

use arena_domain::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-session write locks
#[derive(Default)]
pub struct StateTracker {
    locks: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for one session. Hold the guard across the
    /// full read-modify-write of the session and its turns.
    pub async fn lock_session(&self, id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry once a session is deleted.
    pub fn forget(&self, id: &SessionId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let _ = locks.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_guard_serializes_writers() {
        let tracker = Arc::new(StateTracker::new());
        let session = SessionId::generate();
        let counter = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let tracker = Arc::clone(&tracker);
            let session = session.clone();
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = tracker.lock_session(&session).await;
                // Non-atomic read-modify-write; only safe under the guard
                let value = counter.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.store(value + 1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn test_distinct_sessions_do_not_contend() {
        let tracker = StateTracker::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        let _guard_a = tracker.lock_session(&a).await;
        // Would deadlock if sessions shared a lock
        let _guard_b = tracker.lock_session(&b).await;
    }
}
