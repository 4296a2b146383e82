//! Authenticated encryption of refresh tokens at rest
//!
//! AES-256-GCM envelopes in the wire format `iv.ciphertext.tag`, each part
//! hex-encoded. AEAD gives confidentiality and integrity in one primitive:
//! a tampered ciphertext or stolen-but-altered envelope is rejected outright
//! rather than silently decrypting to garbage. A fresh 12-byte IV is drawn
//! per call, so encrypting the same plaintext twice yields different
//! envelopes.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngExt;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// GCM-recommended IV size: 12 bytes, 24 hex chars on the wire.
pub const IV_LEN: usize = 12;
/// GCM authentication tag: 16 bytes, 32 hex chars on the wire.
pub const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// AES-256-GCM cipher for opaque secrets, keyed at construction.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Build a cipher from a 32-byte key rendered as 64 hex characters.
    ///
    /// A missing or wrong-length key is a startup configuration error; there
    /// is no fallback key.
    pub fn new(key_hex: &str) -> Result<Self> {
        if key_hex.len() != KEY_LEN * 2 {
            return Err(Error::Config(format!(
                "encryption key must be {KEY_LEN} bytes ({} hex characters), got {} characters",
                KEY_LEN * 2,
                key_hex.len()
            )));
        }
        let mut key = hex::decode(key_hex)
            .map_err(|_| Error::Config("encryption key is not valid hex".into()))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| Error::Config("encryption key rejected by cipher".into()));
        key.zeroize();
        Ok(Self { cipher: cipher? })
    }

    /// Encrypt a plaintext into a fresh `iv.ciphertext.tag` envelope.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(Error::Validation(
                "plaintext must be a non-empty string".into(),
            ));
        }

        let mut iv = [0u8; IV_LEN];
        rand::rng().fill(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        // aes-gcm appends the 16-byte tag to the ciphertext; split it back
        // out so the envelope carries the three parts separately.
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Integrity("encryption failed".into()))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}.{}.{}",
            hex::encode(iv),
            hex::encode(&sealed),
            hex::encode(&tag)
        ))
    }

    /// Decrypt an `iv.ciphertext.tag` envelope back to the plaintext.
    ///
    /// Structural problems (part count, hex, byte lengths) are `Format`
    /// errors; an authentication failure — any tampering or corruption in
    /// any part — is an `Integrity` error, so callers can tell "malformed"
    /// from "tampered".
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        if envelope.is_empty() {
            return Err(Error::Format(
                "envelope must be a non-empty string".into(),
            ));
        }

        let parts: Vec<&str> = envelope.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::Format(format!(
                "envelope must have 3 dot-separated parts, got {}",
                parts.len()
            )));
        }

        let iv = decode_part(parts[0], "iv")?;
        let ciphertext = decode_part(parts[1], "ciphertext")?;
        let tag = decode_part(parts[2], "auth tag")?;

        if iv.len() != IV_LEN {
            return Err(Error::Format(format!(
                "iv must be {IV_LEN} bytes, got {}",
                iv.len()
            )));
        }
        if tag.len() != TAG_LEN {
            return Err(Error::Format(format!(
                "auth tag must be {TAG_LEN} bytes, got {}",
                tag.len()
            )));
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let nonce = Nonce::from_slice(&iv);
        let plaintext = self
            .cipher
            .decrypt(nonce, sealed.as_slice())
            .map_err(|_| Error::Integrity("authentication tag mismatch".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Format("decrypted plaintext is not valid UTF-8".into()))
    }

    /// Round-trip a random plaintext for startup health verification.
    /// Persists nothing; returns whether the round trip matched.
    pub fn self_check(&self) -> bool {
        let mut probe = [0u8; 16];
        rand::rng().fill(&mut probe);
        let plaintext = format!("self-check-{}", hex::encode(probe));

        match self.encrypt(&plaintext).and_then(|e| self.decrypt(&e)) {
            Ok(roundtrip) => roundtrip == plaintext,
            Err(_) => false,
        }
    }
}

fn decode_part(part: &str, name: &str) -> Result<Vec<u8>> {
    hex::decode(part).map_err(|_| Error::Format(format!("{name} is not valid hex")))
}
