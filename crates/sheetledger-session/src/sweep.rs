//! Periodic expiry sweep
//!
//! Spawns a background task that runs `sweep_expired` on an interval for
//! backends without native TTL. The surrounding service decides whether to
//! run it; the store never starts it implicitly. Concurrent sweeps are
//! tolerated: deletion is idempotent, and a session deleted mid-sweep just
//! forces re-authentication.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::SessionStore;

/// Spawn a background task that sweeps expired sessions every `interval`.
///
/// Returns a `JoinHandle` for the spawned task; dropping the handle leaves
/// the task running, aborting it stops the sweep.
pub fn spawn_sweep_task(
    store: Arc<SessionStore>,
    interval: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick — nothing has expired since startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.sweep_expired(max_age).await {
                Ok(deleted) => {
                    debug!(deleted, "expiry sweep completed");
                }
                Err(e) => {
                    // surfaced, not retried: the next tick will try again
                    warn!(error = %e, "expiry sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, SessionBackend, session_key};
    use crate::record::{SessionRecord, now_millis};
    use sheetledger_auth::TokenCipher;

    const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[tokio::test(start_paused = true)]
    async fn sweep_task_deletes_expired_sessions_on_tick() {
        let backend = MemoryBackend::new();
        let store = Arc::new(SessionStore::with_backend(
            TokenCipher::new(TEST_KEY).unwrap(),
            Box::new(backend.clone()),
        ));

        let id = sheetledger_auth::generate_session_id();
        store.store(&id, "rt_old", "user@example.com").await.unwrap();

        // age the record past the cutoff
        let key = session_key(&id);
        let raw = backend.get(&key).await.unwrap().unwrap();
        let mut record: SessionRecord = serde_json::from_str(&raw).unwrap();
        record.created_at = now_millis() - 91 * 24 * 60 * 60 * 1000;
        backend
            .set(&key, &serde_json::to_string(&record).unwrap())
            .await
            .unwrap();

        let handle = spawn_sweep_task(
            store.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(90 * 24 * 60 * 60),
        );

        // let the task register its timer, then cross two ticks: the first
        // is skipped, the second sweeps
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(3601)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;

        assert!(!store.exists(&id).await, "expired session must be swept");
        handle.abort();
    }
}
