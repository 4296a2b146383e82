//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults.
//! Key material (session signing key, token encryption key, Redis access
//! token) is loaded from environment variables only, never from the TOML
//! file, to avoid leaking secrets through checked-in config.
//!
//! The process refuses to start with a missing or malformed secret: there
//! is no insecure default key to fall back to.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::secret::Secret;

/// Env var holding the 64-hex-char cookie signing key.
pub const SESSION_SECRET_VAR: &str = "SESSION_SECRET";
/// Env var holding the 64-hex-char refresh-token encryption key.
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";
/// Env var overriding the session store backend selector.
pub const STORE_BACKEND_VAR: &str = "SESSION_STORE_BACKEND";
/// Env var for the Upstash Redis REST endpoint.
pub const REDIS_URL_VAR: &str = "UPSTASH_REDIS_REST_URL";
/// Env var for the Upstash Redis REST access token.
pub const REDIS_TOKEN_VAR: &str = "UPSTASH_REDIS_REST_TOKEN";

/// Root configuration
#[derive(Debug)]
pub struct Config {
    /// HMAC key for session cookie signatures (32 bytes as 64 hex chars)
    pub session_secret: Secret<String>,
    /// AES-256-GCM key for refresh-token envelopes (32 bytes as 64 hex chars)
    pub encryption_key: Secret<String>,
    pub store: StoreConfig,
}

/// Session store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local map; tests and degraded-mode operation only
    Memory,
    /// File-per-key directory store, swept for expiry
    Blob,
    /// Upstash Redis over REST, native per-key TTL
    Redis,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(BackendKind::Memory),
            "blob" => Ok(BackendKind::Blob),
            "redis" => Ok(BackendKind::Redis),
            other => Err(Error::Config(format!(
                "unsupported session store backend: {other} (expected memory, blob, or redis)"
            ))),
        }
    }
}

/// Session store settings
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Directory for the blob backend's file-per-session records
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
    /// Upstash Redis REST endpoint (redis backend only)
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Upstash Redis REST token, env-only
    #[serde(skip)]
    pub redis_token: Option<Secret<String>>,
    /// Sessions older than this are expired (sweep cutoff and Redis TTL)
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            blob_dir: default_blob_dir(),
            redis_url: None,
            redis_token: None,
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_backend() -> BackendKind {
    BackendKind::Blob
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_max_age_days() -> u64 {
    90
}

/// TOML file shape: only the `[store]` table, secrets never live in the file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    store: Option<StoreConfig>,
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay
    /// environment variables.
    ///
    /// The file is optional because a deployment can be configured entirely
    /// through env vars; the two secret keys are always required.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut store = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let file: FileConfig = toml::from_str(&contents)?;
                file.store.unwrap_or_default()
            }
            None => StoreConfig::default(),
        };

        if let Ok(kind) = std::env::var(STORE_BACKEND_VAR) {
            store.backend = kind.parse()?;
        }
        if let Ok(url) = std::env::var(REDIS_URL_VAR) {
            store.redis_url = Some(url);
        }
        if let Ok(token) = std::env::var(REDIS_TOKEN_VAR) {
            store.redis_token = Some(Secret::new(token));
        }

        if store.max_age_days == 0 {
            return Err(Error::Config("max_age_days must be greater than 0".into()));
        }

        if store.backend == BackendKind::Redis
            && (store.redis_url.is_none() || store.redis_token.is_none())
        {
            return Err(Error::Config(format!(
                "{REDIS_URL_VAR} and {REDIS_TOKEN_VAR} are required for the redis backend"
            )));
        }

        Ok(Self {
            session_secret: require_hex_key(SESSION_SECRET_VAR)?,
            encryption_key: require_hex_key(ENCRYPTION_KEY_VAR)?,
            store,
        })
    }

    /// Resolve config file path from a CLI arg or the CONFIG_PATH env var.
    /// Returns None when neither is set: env-only configuration.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from)
    }
}

/// Read a 32-byte key from the named env var, validating the hex rendering.
fn require_hex_key(name: &str) -> Result<Secret<String>> {
    let value = std::env::var(name)
        .map_err(|_| Error::Config(format!("{name} environment variable is required")))?;

    if value.len() != 64 {
        return Err(Error::Config(format!(
            "{name} must be 32 bytes (64 hex characters), got {} characters",
            value.len()
        )));
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(format!(
            "{name} contains non-hex characters"
        )));
    }

    Ok(Secret::new(value))
}
