use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async lock per session id, so two turns for the same session never
/// interleave while different sessions proceed in parallel.
///
/// Entries only live while a turn holds or awaits them.
#[derive(Clone, Default)]
pub struct SessionGate {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one session; dropping it releases the lock and removes
/// the map entry when nobody else is waiting.
pub struct SessionPermit {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    session_id: String,
    locks: Arc<Mutex<LockMap>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: &str) -> SessionPermit {
        let lock = self
            .locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.clone().lock_owned().await;
        SessionPermit {
            guard: Some(guard),
            lock,
            session_id: session_id.to_string(),
            locks: self.locks.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock();
        // the map and this permit; any further handle belongs to a waiter
        if Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.session_id)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock))
        {
            locks.remove(&self.session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_session_waits_for_the_holder() {
        let gate = SessionGate::new();
        let held = gate.acquire("a").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), gate.acquire("a")).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(Duration::from_millis(20), gate.acquire("b")).await;
        assert!(other.is_ok());

        drop(held);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), gate.acquire("a"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn released_sessions_leave_no_entry() {
        let gate = SessionGate::new();
        for index in 0..200 {
            drop(gate.acquire(&format!("session-{index}")).await);
        }
        assert!(gate.is_empty());

        let held = gate.acquire("busy").await;
        assert_eq!(gate.len(), 1);
        drop(held);
        assert!(gate.is_empty());
    }

    #[tokio::test]
    async fn entry_survives_while_a_turn_is_queued() {
        let gate = SessionGate::new();
        let held = gate.acquire("s").await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire("s").await;
                gate.len()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(gate.len(), 1);
        // the queued turn still ran under the same lock entry
        assert_eq!(waiter.await.unwrap(), 1);
        assert!(gate.is_empty());
    }
}
