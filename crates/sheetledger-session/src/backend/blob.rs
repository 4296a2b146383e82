//! File-per-key blob directory backend
//!
//! Each session record is one file in a flat directory. All writes use
//! atomic temp-file + rename to prevent corruption on crash, and records
//! get 0600 permissions since they hold encrypted OAuth tokens. No native
//! TTL: expiry relies on the sweep enumerating `list_keys`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

use super::{KEY_PREFIX, SessionBackend};

/// Durable blob-style store: one file per key under a directory.
pub struct BlobBackend {
    dir: PathBuf,
}

impl BlobBackend {
    /// Open (creating if needed) the backing directory.
    pub async fn open(dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            Error::Backend(format!(
                "creating session directory {}: {e}",
                dir.display()
            ))
        })?;
        debug!(dir = %dir.display(), "opened blob session store");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

/// Keys contain `:`, which some filesystems refuse. The fixed key prefix
/// maps to a fixed file stem, so the mapping inverts for any id, including
/// ids containing `-`.
const FILE_PREFIX: &str = "session-";

fn file_name(key: &str) -> String {
    format!("{FILE_PREFIX}{}", key.strip_prefix(KEY_PREFIX).unwrap_or(key))
}

fn key_name(file: &str) -> String {
    format!("{KEY_PREFIX}{}", file.strip_prefix(FILE_PREFIX).unwrap_or(file))
}

#[async_trait]
impl SessionBackend for BlobBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Backend(format!("reading session record: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.dir, &self.path_for(key), value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Backend(format!("deleting session record: {e}"))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .map_err(|e| Error::Backend(format!("checking session record: {e}")))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::Backend(format!("listing session directory: {e}")))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Backend(format!("listing session directory: {e}")))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            // skip in-flight temp files
            if name.starts_with('.') {
                continue;
            }
            keys.push(key_name(name));
        }
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "blob"
    }
}

/// Sequence number making each in-flight temp file unique within the
/// process; concurrent writes to different keys must not share a temp path.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write a record atomically: temp file in the same directory, then rename
/// over the target. Prevents a crash mid-write from leaving a truncated
/// record. Permissions are 0600 (owner read/write only).
async fn write_atomic(dir: &Path, path: &Path, value: &str) -> Result<()> {
    let tmp_path = dir.join(format!(
        ".session.tmp.{}.{}",
        std::process::id(),
        WRITE_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&tmp_path, value.as_bytes())
        .await
        .map_err(|e| Error::Backend(format!("writing temp session record: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Backend(format!("setting session record permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Backend(format!("renaming temp session record: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_and_key_names_invert() {
        let key = "session:0a1b2c";
        assert_eq!(file_name(key), "session-0a1b2c");
        assert_eq!(key_name(&file_name(key)), key);

        // ids containing '-' round-trip too
        let dashed = "session:0a-1b-2c";
        assert_eq!(key_name(&file_name(dashed)), dashed);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BlobBackend::open(dir.path().to_path_buf()).await.unwrap();
        backend.set("session:abc", r#"{"v":1}"#).await.unwrap();

        let reopened = BlobBackend::open(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(
            reopened.get("session:abc").await.unwrap().as_deref(),
            Some(r#"{"v":1}"#)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn record_files_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let backend = BlobBackend::open(dir.path().to_path_buf()).await.unwrap();
        backend.set("session:abc", "{}").await.unwrap();

        let path = dir.path().join("session-abc");
        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "session record must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn list_skips_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BlobBackend::open(dir.path().to_path_buf()).await.unwrap();
        backend.set("session:abc", "{}").await.unwrap();
        tokio::fs::write(dir.path().join(".session.tmp.999"), "partial")
            .await
            .unwrap();

        let keys = backend.list_keys().await.unwrap();
        assert_eq!(keys, vec!["session:abc"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_to_distinct_keys_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let backend = std::sync::Arc::new(
            BlobBackend::open(dir.path().to_path_buf()).await.unwrap(),
        );

        let mut handles = vec![];
        for i in 0..50 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .set(&format!("session:key{i}"), &format!(r#"{{"v":{i}}}"#))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // every key holds its own record, none lost or cross-written
        for i in 0..50 {
            let value = backend
                .get(&format!("session:key{i}"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(value, format!(r#"{{"v":{i}}}"#));
        }
    }

    #[tokio::test]
    async fn unopenable_directory_is_backend_error() {
        let result = BlobBackend::open(PathBuf::from("/proc/definitely/not/writable")).await;
        assert!(result.is_err());
    }
}
