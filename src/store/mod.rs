//! Local secret cache and audit log with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database, the durable plaintext cache

mod memory;
mod sqlite;

pub use memory::InMemorySecretStore;
pub use sqlite::SqliteSecretStore;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A locally cached secret, keyed by (owner, repo, name).
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub repository_owner: String,
    pub repository_name: String,
    pub secret_name: String,
    pub secret_value: String,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("repository_owner", &self.repository_owner)
            .field("repository_name", &self.repository_name)
            .field("secret_name", &self.secret_name)
            .field("secret_value", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Updated,
    Deleted,
    /// Local row purged because the remote store no longer has the secret.
    Reconciled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Updated => "updated",
            AuditAction::Deleted => "deleted",
            AuditAction::Reconciled => "reconciled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "updated" => Some(AuditAction::Updated),
            "deleted" => Some(AuditAction::Deleted),
            "reconciled" => Some(AuditAction::Reconciled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable audit log entry. `id` increases with append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub repository_owner: String,
    pub repository_name: String,
    pub secret_name: String,
    pub action: AuditAction,
    pub performed_at: String,
}

static LAST_TIMESTAMP: Mutex<Option<DateTime<Utc>>> = Mutex::new(None);

/// Current UTC time as a fixed-width RFC3339 string (sorts lexicographically).
///
/// Strictly increasing within the process: a call landing in the same
/// microsecond as the previous one is bumped forward by one microsecond.
pub fn now_string() -> String {
    let mut last = LAST_TIMESTAMP
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut now = Utc::now().trunc_subsecs(6);
    if let Some(prev) = *last {
        if now <= prev {
            now = prev + Duration::microseconds(1);
        }
    }
    *last = Some(now);
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Plaintext secret cache - implemented by all storage backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    async fn get(&self, owner: &str, repo: &str, name: &str) -> Result<Option<Secret>, String>;

    /// All cached secrets for a repository, ordered by name.
    async fn list_by_repo(&self, owner: &str, repo: &str) -> Result<Vec<Secret>, String>;

    /// Atomic insert-or-overwrite on (owner, repo, name).
    ///
    /// `created_at` is set only on first insert; `updated_at` is refreshed on every call.
    async fn upsert(&self, owner: &str, repo: &str, name: &str, value: &str)
        -> Result<Secret, String>;

    /// Remove a cached secret. Deleting an absent key is a no-op.
    async fn delete(&self, owner: &str, repo: &str, name: &str) -> Result<(), String>;

    /// Remove a cached secret only if its `updated_at` still equals `updated_at`.
    /// Returns whether a row was removed.
    async fn delete_if_unchanged(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        updated_at: &str,
    ) -> Result<bool, String>;
}

/// Append-only mutation history.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        action: AuditAction,
    ) -> Result<AuditEntry, String>;

    /// Entries for a repository (optionally a single secret) in append order.
    async fn history(
        &self,
        owner: &str,
        repo: &str,
        name: Option<&str>,
    ) -> Result<Vec<AuditEntry>, String>;
}
