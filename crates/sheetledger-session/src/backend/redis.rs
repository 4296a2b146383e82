//! Upstash Redis REST backend
//!
//! Talks the Upstash REST protocol: a command is POSTed to the base URL as
//! a JSON array (`["SETEX", key, ttl, value]`) with a bearer token, and the
//! response is `{"result": ...}` or `{"error": "..."}`. Every write uses
//! SETEX, so Redis evicts expired sessions itself and the sweep is a no-op.

use async_trait::async_trait;
use common::Secret;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};

use super::SessionBackend;

/// Durable key-value store with native per-key TTL.
pub struct RedisBackend {
    client: reqwest::Client,
    base_url: String,
    token: Secret<String>,
    ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
struct RedisResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RedisBackend {
    /// Build a backend against an Upstash REST endpoint. Missing
    /// credentials are a configuration error; the store must not come up
    /// half-connected.
    pub fn new(url: &str, token: Secret<String>, ttl_secs: u64) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::Config("redis REST URL must not be empty".into()));
        }
        if token.expose().is_empty() {
            return Err(Error::Config("redis REST token must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("building redis HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
            token,
            ttl_secs,
        })
    }

    /// POST one command array and return its `result` field.
    async fn command(&self, command: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(self.token.expose())
            .json(&command)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("redis request failed: {e}")))?;

        let status = response.status();
        let body: RedisResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("redis response parse failed: {e}")))?;

        if let Some(error) = body.error {
            return Err(Error::Backend(format!("redis error: {error}")));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!("redis returned HTTP {status}")));
        }

        debug!(status = %status, "redis command completed");
        Ok(body.result.unwrap_or(Value::Null))
    }
}

// Command builders are separated from I/O so the wire encoding is testable
// without a live server.

fn setex_command(key: &str, ttl_secs: u64, value: &str) -> Value {
    json!(["SETEX", key, ttl_secs.to_string(), value])
}

fn get_command(key: &str) -> Value {
    json!(["GET", key])
}

fn del_command(key: &str) -> Value {
    json!(["DEL", key])
}

fn exists_command(key: &str) -> Value {
    json!(["EXISTS", key])
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.command(get_command(key)).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(Error::Backend(format!(
                "unexpected redis GET result: {other}"
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(setex_command(key, self.ttl_secs, value))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.command(del_command(key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.command(exists_command(key)).await? {
            Value::Number(n) => Ok(n.as_u64() == Some(1)),
            other => Err(Error::Backend(format!(
                "unexpected redis EXISTS result: {other}"
            ))),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        // Never reached: has_native_ttl() keeps the sweep away, and nothing
        // else enumerates sessions.
        Err(Error::Backend(
            "redis backend does not enumerate keys; expiry is native TTL".into(),
        ))
    }

    fn has_native_ttl(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setex_encodes_ttl_and_value() {
        let cmd = setex_command("session:abc", 7776000, r#"{"v":1}"#);
        assert_eq!(cmd, json!(["SETEX", "session:abc", "7776000", r#"{"v":1}"#]));
    }

    #[test]
    fn read_commands_encode_key_only() {
        assert_eq!(get_command("session:abc"), json!(["GET", "session:abc"]));
        assert_eq!(del_command("session:abc"), json!(["DEL", "session:abc"]));
        assert_eq!(
            exists_command("session:abc"),
            json!(["EXISTS", "session:abc"])
        );
    }

    #[test]
    fn empty_credentials_rejected() {
        assert!(matches!(
            RedisBackend::new("", Secret::new("tok".to_owned()), 60),
            Err(Error::Config(_))
        ));

        assert!(matches!(
            RedisBackend::new("https://example.upstash.io", Secret::new(String::new()), 60),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn base_url_is_normalized() {
        let backend = RedisBackend::new(
            "https://example.upstash.io/",
            Secret::new("tok".to_owned()),
            60,
        )
        .unwrap();
        assert_eq!(backend.base_url, "https://example.upstash.io");
        assert!(backend.has_native_ttl());
        assert_eq!(backend.name(), "redis");
    }

    #[test]
    fn response_shapes_deserialize() {
        let ok: RedisResponse = serde_json::from_str(r#"{"result":"OK"}"#).unwrap();
        assert_eq!(ok.result, Some(Value::String("OK".into())));
        assert!(ok.error.is_none());

        let err: RedisResponse =
            serde_json::from_str(r#"{"error":"WRONGPASS invalid token"}"#).unwrap();
        assert!(err.result.is_none());
        assert_eq!(err.error.as_deref(), Some("WRONGPASS invalid token"));

        let nil: RedisResponse = serde_json::from_str(r#"{"result":null}"#).unwrap();
        assert_eq!(nil.result, None);
    }
}
