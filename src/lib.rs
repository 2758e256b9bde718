//! # Mini-game Agent Library
//!
//! Server-side plumbing for WeChat, QQ and Toutiao mini-games: a credential
//! cache façade over a TTL store, one vendor-table driven client for the
//! platform APIs, and QR image persistence.
//!
//! Modules:
//! - `cache` - credential cache façade and its stores (memory, redis)
//! - `vendors` - per-vendor endpoint and status tables
//! - `transport` - HTTP seam used by the client
//! - `client` - `MiniGameClient` and the `ClientRegistry`
//! - `qrcode` - QR extension mapping and storage sinks
//! - `config` - YAML configuration and validation

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod qrcode;
pub mod server;
#[cfg(test)]
pub mod tests;
pub mod transport;
pub mod utils;
pub mod vendors;

pub use crate::cache::credential_cache::CredentialCache;
pub use crate::client::{ClientRegistry, MiniGameClient};
pub use crate::config::clients::{ServiceConfig, VendorConfig};
pub use crate::error::{ConfigError, Error, Result, TransportError};
pub use crate::vendors::Vendor;
