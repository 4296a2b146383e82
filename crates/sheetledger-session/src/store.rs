//! Session store: encrypted refresh-token custody behind the backend seam
//!
//! Per session key the lifecycle is absent → active → (lastUsed bumped on
//! each read) → deleted, where deletion is explicit (logout) or by the
//! expiry sweep. The refresh token is encrypted before it reaches any
//! backend and decrypted on the way out; the plaintext never touches disk
//! or logs.

use std::time::Duration;

use tracing::{debug, info, warn};

use common::{BackendKind, Config, StoreConfig};
use sheetledger_auth::TokenCipher;

use crate::backend::{BlobBackend, MemoryBackend, RedisBackend, SessionBackend, session_key};
use crate::error::{Error, Result};
use crate::record::{SessionRecord, now_millis};

/// Sessions older than this are swept (and Redis records carry it as TTL).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Decrypted view of a session handed back to the caller.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub refresh_token: String,
    pub user_email: String,
    pub created_at: u64,
    pub last_used: u64,
}

/// Persists encrypted refresh tokens keyed by session id.
pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    cipher: TokenCipher,
}

impl SessionStore {
    /// Build the store from configuration: construct the cipher, then the
    /// configured backend.
    ///
    /// Backend initialization failure is fatal, with one deliberate
    /// exception: an unavailable blob directory downgrades to the in-memory
    /// map so local development stays unblocked. That downgrade silently
    /// drops durability, so it is logged loudly.
    pub async fn open(config: &Config) -> Result<Self> {
        let cipher = TokenCipher::new(config.encryption_key.expose())?;
        let backend = select_backend(&config.store).await?;
        info!(backend = backend.name(), "session store ready");
        Ok(Self { backend, cipher })
    }

    /// Assemble a store from parts; tests and embedders use this to pair a
    /// cipher with an explicit backend.
    pub fn with_backend(cipher: TokenCipher, backend: Box<dyn SessionBackend>) -> Self {
        Self { backend, cipher }
    }

    /// Short name of the active backend, for health reporting.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Encrypt and persist a refresh token under a session id.
    pub async fn store(
        &self,
        session_id: &str,
        refresh_token: &str,
        user_email: &str,
    ) -> Result<()> {
        if session_id.is_empty() || refresh_token.is_empty() || user_email.is_empty() {
            return Err(Error::Validation(
                "session_id, refresh_token, and user_email are required".into(),
            ));
        }

        let now = now_millis();
        let record = SessionRecord {
            refresh_token: self.cipher.encrypt(refresh_token)?,
            user_email: user_email.to_owned(),
            created_at: now,
            last_used: now,
        };

        self.write_record(&session_key(session_id), &record).await?;
        debug!(backend = self.backend.name(), "stored session record");
        Ok(())
    }

    /// Retrieve and decrypt a session's refresh token, bumping `lastUsed`.
    ///
    /// A missing key is `NotFound` and propagates: the caller needs to
    /// distinguish "no such session" (re-login) from "session exists but
    /// corrupted" (alert).
    pub async fn retrieve(&self, session_id: &str) -> Result<SessionTokens> {
        if session_id.is_empty() {
            return Err(Error::Validation("session_id is required".into()));
        }

        let key = session_key(session_id);
        let raw = self
            .backend
            .get(&key)
            .await?
            .ok_or_else(|| Error::NotFound("session not found".into()))?;

        let mut record: SessionRecord = serde_json::from_str(&raw)
            .map_err(|e| Error::Backend(format!("corrupt session record: {e}")))?;

        let refresh_token = self.cipher.decrypt(&record.refresh_token)?;

        // Last-writer-wins is fine here: a lost update under-reports
        // recency, it never touches the envelope.
        record.last_used = now_millis();
        self.write_record(&key, &record).await?;

        Ok(SessionTokens {
            refresh_token,
            user_email: record.user_email,
            created_at: record.created_at,
            last_used: record.last_used,
        })
    }

    /// Remove a session. Deleting a non-existent key is not an error.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        if session_id.is_empty() {
            return Err(Error::Validation("session_id is required".into()));
        }
        self.backend.delete(&session_key(session_id)).await
    }

    /// Whether a session exists. Best-effort for UI decisions, not a
    /// security gate: backend errors are swallowed to `false`.
    pub async fn exists(&self, session_id: &str) -> bool {
        if session_id.is_empty() {
            return false;
        }
        match self.backend.exists(&session_key(session_id)).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(error = %e, "exists check failed, reporting false");
                false
            }
        }
    }

    /// Delete sessions older than `max_age`, returning the count deleted.
    ///
    /// A no-op returning 0 on backends with native TTL; those already evict
    /// records written with the same lifetime. Unreadable records are
    /// skipped, not fatal: one corrupt entry must not stall the sweep.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize> {
        if self.backend.has_native_ttl() {
            return Ok(0);
        }

        let cutoff = now_millis().saturating_sub(max_age.as_millis() as u64);
        let keys = self.backend.list_keys().await?;

        let mut deleted = 0;
        for key in keys {
            match self.sweep_one(&key, cutoff).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(key, error = %e, "skipping session during sweep"),
            }
        }

        if deleted > 0 {
            info!(deleted, backend = self.backend.name(), "swept expired sessions");
        }
        Ok(deleted)
    }

    async fn sweep_one(&self, key: &str, cutoff: u64) -> Result<bool> {
        let Some(raw) = self.backend.get(key).await? else {
            // deleted by a concurrent sweep or logout; nothing to do
            return Ok(false);
        };
        let record: SessionRecord = serde_json::from_str(&raw)
            .map_err(|e| Error::Backend(format!("corrupt session record: {e}")))?;

        if record.created_at < cutoff {
            self.backend.delete(key).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn write_record(&self, key: &str, record: &SessionRecord) -> Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| Error::Backend(format!("serializing session record: {e}")))?;
        self.backend.set(key, &json).await
    }
}

/// Construct the configured backend.
async fn select_backend(config: &StoreConfig) -> Result<Box<dyn SessionBackend>> {
    match config.backend {
        BackendKind::Memory => Ok(Box::new(MemoryBackend::new())),
        BackendKind::Blob => match BlobBackend::open(config.blob_dir.clone()).await {
            Ok(backend) => Ok(Box::new(backend)),
            Err(e) => {
                warn!(
                    error = %e,
                    dir = %config.blob_dir.display(),
                    "blob session store unavailable, falling back to in-memory; \
                     sessions will NOT survive a restart"
                );
                Ok(Box::new(MemoryBackend::new()))
            }
        },
        BackendKind::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| Error::Config("redis backend requires a REST URL".into()))?;
            let token = config
                .redis_token
                .clone()
                .ok_or_else(|| Error::Config("redis backend requires a REST token".into()))?;
            let ttl_secs = config.max_age_days * 24 * 60 * 60;
            Ok(Box::new(RedisBackend::new(url, token, ttl_secs)?))
        }
    }
}
