//! Remote secret store boundary.
//!
//! The remote store is write-only for values: it hands out a recipient public
//! key, lists secret metadata, and accepts sealed values. [`GitHubClient`] is
//! the production implementation (GitHub Actions repository secrets).

mod github;

pub use github::GitHubClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode remote response: {0}")]
    Decode(String),
}

/// Per-repository public key that secret values must be sealed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientKey {
    pub key_id: String,
    /// Base64-encoded X25519 public key
    pub key: String,
}

/// Secret metadata as reported by the remote store (never includes the value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSecretMetadata {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Operations the synchronizer needs from the remote secret store.
#[async_trait]
pub trait SecretGateway: Send + Sync {
    async fn recipient_key(&self, owner: &str, repo: &str) -> Result<RecipientKey, RemoteError>;

    async fn list_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RemoteSecretMetadata>, RemoteError>;

    /// Create or update a secret with an already sealed, base64-encoded value.
    async fn put_sealed_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        sealed_value_b64: &str,
        key_id: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_secret(&self, owner: &str, repo: &str, name: &str)
        -> Result<(), RemoteError>;
}
