//! # secret_sync
//!
//! Manage GitHub Actions repository secrets with a local plaintext cache.
//!
//! GitHub only ever accepts sealed values and never returns them. This service
//! seals values for the repository's public key before they leave the process,
//! keeps the plaintext in a local SQLite cache so it can be viewed and edited
//! later, and records every mutation in an append-only audit log.
//!
//! ```text
//!   HTTP API ──► Synchronizer ──► crypto::seal ──► GitHub (SecretGateway)
//!                     │
//!                     ├──► SecretStore (plaintext cache)
//!                     └──► AuditLog   (append-only)
//! ```
//!
//! ## Modules
//! - `api`: axum routes and bearer-token forwarding
//! - `secrets`: the synchronizer (list, read, upsert, delete)
//! - `crypto`: sealed-box encryption for recipient public keys
//! - `remote`: remote store trait and the GitHub client
//! - `store`: cache and audit log backends (SQLite, in-memory)

pub mod api;
pub mod config;
pub mod crypto;
pub mod remote;
pub mod secrets;
pub mod store;
pub mod util;

pub use config::Config;
pub use secrets::{SyncError, Synchronizer};
