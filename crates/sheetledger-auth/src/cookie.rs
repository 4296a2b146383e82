//! Tamper-evident session cookies
//!
//! A session cookie is `<sessionId>.<signature>` where the signature is
//! HMAC-SHA256 over the session id, keyed by a process-wide signing secret.
//! The signature is recomputed on every check, never stored. The cookie name
//! carries the `__Host-` prefix, which browsers only accept with `Secure`,
//! no `Domain`, and `Path=/` — binding the cookie to the exact origin and
//! blocking subdomain or sibling-site cookie injection.

use hmac::{Hmac, Mac};
use rand::RngExt;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Host-locked cookie name; any path/domain override would be rejected by
/// the browser, which is the point.
pub const COOKIE_NAME: &str = "__Host-session";
/// 30 days, balancing persistent login against the blast radius of a leak.
pub const COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Session ids and signatures are both 32 bytes as 64 lowercase hex chars.
const SESSION_ID_LEN: usize = 64;
const SIGNATURE_LEN: usize = 64;
const KEY_LEN: usize = 32;

/// Result of parsing a raw cookie value.
///
/// `session_id`/`signature` are populated when the value is structurally
/// sound, even if the signature check failed; both are `None` on structural
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub session_id: Option<String>,
    pub signature: Option<String>,
    pub valid: bool,
}

impl ParsedCookie {
    fn invalid() -> Self {
        Self {
            session_id: None,
            signature: None,
            valid: false,
        }
    }
}

/// Outcome of validating an inbound request's cookie header.
/// `session_id` is only populated when the cookie fully validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSession {
    pub session_id: Option<String>,
    pub valid: bool,
}

impl RequestSession {
    fn unauthenticated() -> Self {
        Self {
            session_id: None,
            valid: false,
        }
    }
}

/// Generate a cryptographically random session id: 32 bytes as 64 lowercase
/// hex characters. Never reused after deletion; ids are not predictable.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Signs session ids and renders/parses the cookie wire format.
pub struct CookieMinter {
    key: Vec<u8>,
}

impl CookieMinter {
    /// Build a minter from a 32-byte signing key rendered as 64 hex chars.
    /// A missing or malformed key is a fatal configuration error.
    pub fn new(secret_hex: &str) -> Result<Self> {
        if secret_hex.len() != KEY_LEN * 2 {
            return Err(Error::Config(format!(
                "session secret must be {KEY_LEN} bytes ({} hex characters), got {} characters",
                KEY_LEN * 2,
                secret_hex.len()
            )));
        }
        let key = hex::decode(secret_hex)
            .map_err(|_| Error::Config("session secret is not valid hex".into()))?;
        Ok(Self { key })
    }

    /// HMAC-SHA256 signature over the session id, as 64 hex characters.
    pub fn sign_session_id(&self, session_id: &str) -> Result<String> {
        if session_id.is_empty() {
            return Err(Error::Validation(
                "session id must be a non-empty string".into(),
            ));
        }
        Ok(hex::encode(self.sign_raw(session_id)))
    }

    /// Verify a signature against a session id in constant time.
    ///
    /// Returns `false` on any malformed input rather than erroring; the
    /// comparison never short-circuits on content, so signature checks leak
    /// no timing information.
    pub fn verify_signature(&self, session_id: &str, signature: &str) -> bool {
        if session_id.is_empty() || signature.is_empty() {
            return false;
        }
        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let mut expected = self.sign_raw(session_id);
        let matched = expected.ct_eq(&provided).into();
        expected.zeroize();
        matched
    }

    /// Render `<id>.<signature>`, generating a fresh id when none is given.
    pub fn create_cookie_value(&self, session_id: Option<&str>) -> Result<String> {
        let id = match session_id {
            Some(id) => id.to_owned(),
            None => generate_session_id(),
        };
        let signature = self.sign_session_id(&id)?;
        Ok(format!("{id}.{signature}"))
    }

    /// Parse and validate a raw cookie value.
    pub fn parse_cookie_value(&self, value: &str) -> ParsedCookie {
        let Some((session_id, signature)) = value.split_once('.') else {
            return ParsedCookie::invalid();
        };
        if signature.contains('.')
            || session_id.len() != SESSION_ID_LEN
            || signature.len() != SIGNATURE_LEN
        {
            return ParsedCookie::invalid();
        }

        let valid = self.verify_signature(session_id, signature);
        ParsedCookie {
            session_id: Some(session_id.to_owned()),
            signature: Some(signature.to_owned()),
            valid,
        }
    }

    /// Render the full `Set-Cookie` value with the required security
    /// attributes, generating a fresh session id when none is given.
    pub fn create_set_cookie_header(&self, session_id: Option<&str>) -> Result<String> {
        let value = self.create_cookie_value(session_id)?;
        Ok(format!(
            "{COOKIE_NAME}={value}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}"
        ))
    }

    /// Render a `Set-Cookie` value that clears the session cookie.
    pub fn create_clear_cookie_header(&self) -> String {
        format!("{COOKIE_NAME}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0")
    }

    /// Scan a semicolon-delimited `Cookie` header for our cookie.
    /// Tolerant of surrounding whitespace and unrelated cookies.
    pub fn extract_cookie<'a>(&self, cookie_header: &'a str) -> Option<&'a str> {
        for cookie in cookie_header.split(';') {
            if let Some(rest) = cookie.trim().strip_prefix(COOKIE_NAME)
                && let Some(value) = rest.strip_prefix('=')
            {
                return Some(value);
            }
        }
        None
    }

    /// Extraction + parsing for an inbound request. Any failure along the
    /// way fails closed to "unauthenticated"; nothing here can panic a
    /// request over a malformed cookie.
    pub fn validate_request(&self, cookie_header: Option<&str>) -> RequestSession {
        let Some(header) = cookie_header else {
            return RequestSession::unauthenticated();
        };
        let Some(value) = self.extract_cookie(header) else {
            return RequestSession::unauthenticated();
        };

        let parsed = self.parse_cookie_value(value);
        RequestSession {
            session_id: if parsed.valid { parsed.session_id } else { None },
            valid: parsed.valid,
        }
    }

    fn sign_raw(&self, session_id: &str) -> Vec<u8> {
        // HMAC accepts any key length; the 32-byte constraint is enforced at
        // construction, so this cannot fail for a constructed minter.
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("key length validated in CookieMinter::new"),
        };
        mac.update(session_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl Drop for CookieMinter {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
