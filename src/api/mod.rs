//! HTTP API for secret_sync.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/auth/validate` - Check a GitHub token
//! - `GET /api/repositories` - Repositories visible to the caller's token
//! - `GET /api/repositories/{owner}/{repo}/secrets` - Remote secrets merged with cache timestamps
//! - `POST /api/repositories/{owner}/{repo}/secrets` - Create or update a secret
//! - `GET /api/repositories/{owner}/{repo}/secrets/{name}` - Cached plaintext value
//! - `DELETE /api/repositories/{owner}/{repo}/secrets/{name}` - Delete a secret
//! - `GET /api/repositories/{owner}/{repo}/secrets/{name}/history` - Audit entries
//!
//! Everything except health and token validation requires `Authorization: Bearer <github token>`.

mod auth;
mod repositories;
mod routes;
pub mod secrets;
pub mod types;

pub use routes::{app, serve, AppState};
pub use types::*;
