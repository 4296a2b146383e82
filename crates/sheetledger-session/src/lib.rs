//! Durable custody of encrypted refresh tokens, keyed by session id
//!
//! The session store persists `{encrypted refresh token, account email,
//! createdAt, lastUsed}` behind a backend-selection seam: a process-local
//! map, a file-per-key blob directory, or Upstash Redis over REST. Tokens
//! are encrypted via `sheetledger_auth::TokenCipher` before they touch any
//! backend; the plaintext is never stored or logged.
//!
//! Backends without native TTL (memory, blob) rely on `sweep_expired`;
//! `spawn_sweep_task` runs it periodically. The Redis backend writes every
//! record with a TTL instead, so the sweep is a no-op there.

pub mod backend;
pub mod error;
pub mod record;
pub mod store;
pub mod sweep;

pub use backend::{BlobBackend, MemoryBackend, RedisBackend, SessionBackend};
pub use error::{Error, Result};
pub use record::SessionRecord;
pub use store::{DEFAULT_MAX_AGE, SessionStore, SessionTokens};
pub use sweep::spawn_sweep_task;
