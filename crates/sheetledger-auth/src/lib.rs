//! Session and token security primitives for the sheetledger gateway
//!
//! The three stateless pieces of the credential-custody core: PKCE pair
//! generation for the OAuth authorization flow, authenticated encryption of
//! refresh tokens at rest, and tamper-evident session cookies. This crate is
//! a standalone library with no dependency on any HTTP layer — it can be
//! tested and used independently.
//!
//! Authentication flow:
//! 1. Login handler calls `pkce::generate_pair()` and stashes the verifier
//!    server-side before redirecting to the identity provider
//! 2. Callback handler checks `pkce::verify_challenge()` and exchanges the
//!    code for tokens out-of-crate
//! 3. Handler mints a cookie via `cookie::CookieMinter::create_set_cookie_header()`
//! 4. The session store encrypts the refresh token with `cipher::TokenCipher`
//! 5. Every later request is checked with `CookieMinter::validate_request()`

pub mod cipher;
pub mod cookie;
pub mod error;
pub mod pkce;

pub use cipher::TokenCipher;
pub use cookie::{CookieMinter, ParsedCookie, RequestSession, generate_session_id};
pub use error::{Error, Result};
pub use pkce::{PkcePair, compute_challenge, generate_pair, generate_verifier, verify_challenge};
