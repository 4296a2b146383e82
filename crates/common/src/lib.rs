//! Common types for the sheetledger credential-custody core

mod config;
mod error;
mod secret;

pub use config::{BackendKind, Config, StoreConfig};
pub use error::{Error, Result};
pub use secret::Secret;
