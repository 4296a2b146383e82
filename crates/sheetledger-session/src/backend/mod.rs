//! Session store backend seam
//!
//! One contract, three implementations, selected at construction time by
//! configuration. Backends move opaque JSON strings; encryption and record
//! semantics live a layer up in `SessionStore`, so every backend satisfies
//! the identical property suite.

use async_trait::async_trait;

use crate::error::Result;

mod blob;
mod memory;
mod redis;

pub use blob::BlobBackend;
pub use memory::MemoryBackend;
pub use redis::RedisBackend;

/// Session records are namespaced under this prefix in every backend.
pub const KEY_PREFIX: &str = "session:";

/// Full backend key for a session id.
pub fn session_key(session_id: &str) -> String {
    format!("{KEY_PREFIX}{session_id}")
}

/// Key-value contract every backend implements.
///
/// Per-key reads and writes are atomic (last-writer-wins); values are
/// written whole, never patched in place.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Read the raw value for a key; `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the raw value for a key, creating or replacing it.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether a key currently exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Enumerate all stored keys, for the expiry sweep. Backends with
    /// native TTL may refuse; the sweep never calls them.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// True when the backend evicts records itself (per-key TTL on write),
    /// making the expiry sweep redundant.
    fn has_native_ttl(&self) -> bool {
        false
    }

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_applies_prefix() {
        assert_eq!(session_key("abc123"), "session:abc123");
    }

    /// Contract suite run against every non-network backend.
    async fn backend_contract_suite(backend: &dyn SessionBackend) {
        // absent key
        assert_eq!(backend.get("session:missing").await.unwrap(), None);
        assert!(!backend.exists("session:missing").await.unwrap());

        // write and read back
        backend.set("session:k1", r#"{"v":1}"#).await.unwrap();
        assert_eq!(
            backend.get("session:k1").await.unwrap().as_deref(),
            Some(r#"{"v":1}"#)
        );
        assert!(backend.exists("session:k1").await.unwrap());

        // overwrite is last-writer-wins
        backend.set("session:k1", r#"{"v":2}"#).await.unwrap();
        assert_eq!(
            backend.get("session:k1").await.unwrap().as_deref(),
            Some(r#"{"v":2}"#)
        );

        // enumeration sees all keys
        backend.set("session:k2", "{}").await.unwrap();
        let mut keys = backend.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:k1", "session:k2"]);

        // delete is idempotent
        backend.delete("session:k1").await.unwrap();
        assert_eq!(backend.get("session:k1").await.unwrap(), None);
        backend.delete("session:k1").await.unwrap();
        assert!(!backend.exists("session:k1").await.unwrap());
    }

    #[tokio::test]
    async fn memory_backend_satisfies_contract() {
        let backend = MemoryBackend::new();
        backend_contract_suite(&backend).await;
        assert!(!backend.has_native_ttl());
        assert_eq!(backend.name(), "memory");
    }

    #[tokio::test]
    async fn blob_backend_satisfies_contract() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BlobBackend::open(dir.path().to_path_buf()).await.unwrap();
        backend_contract_suite(&backend).await;
        assert!(!backend.has_native_ttl());
        assert_eq!(backend.name(), "blob");
    }
}
