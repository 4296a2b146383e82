//! Persisted session record shape
//!
//! The wire shape is backend-agnostic JSON with camelCase field names, so a
//! record written by one backend can be read after a backend migration.

use serde::{Deserialize, Serialize};

/// One session's stored state. `refresh_token` holds the *encrypted*
/// envelope, never the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub refresh_token: String,
    pub user_email: String,
    /// Creation time, unix epoch milliseconds
    pub created_at: u64,
    /// Bumped on every successful retrieval, epoch milliseconds
    pub last_used: u64,
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_camel_case() {
        let record = SessionRecord {
            refresh_token: "aa.bb.cc".into(),
            user_email: "user@example.com".into(),
            created_at: 1700000000000,
            last_used: 1700000001000,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["refreshToken"], "aa.bb.cc");
        assert_eq!(json["userEmail"], "user@example.com");
        assert_eq!(json["createdAt"], 1700000000000u64);
        assert_eq!(json["lastUsed"], 1700000001000u64);
    }

    #[test]
    fn roundtrips_through_json() {
        let raw = r#"{"refreshToken":"iv.ct.tag","userEmail":"a@b.c","createdAt":1,"lastUsed":2}"#;
        let record: SessionRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.user_email, "a@b.c");
        assert_eq!(record.created_at, 1);
        assert_eq!(record.last_used, 2);
    }

    #[test]
    fn now_millis_is_sane() {
        let now = now_millis();
        // after 2023-01-01 and monotonic-ish
        assert!(now > 1_672_531_200_000);
        assert!(now_millis() >= now);
    }
}
