//! The four request-scoped secret operations: list, read, upsert, delete.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::SyncError;
use crate::crypto;
use crate::remote::SecretGateway;
use crate::store::{AuditAction, AuditEntry, AuditLog, Secret, SecretStore};

/// A remote secret merged with its local cache timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedSecretView {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Orchestrates the remote gateway, the sealer, the local cache and the audit log.
///
/// Holds no per-request state; the gateway is passed to each call because it
/// carries the caller's credentials.
pub struct Synchronizer {
    store: Arc<dyn SecretStore>,
    audit: Arc<dyn AuditLog>,
    purge_stale: bool,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn SecretStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            audit,
            purge_stale: true,
        }
    }

    /// Whether `list` removes cached rows for secrets the remote no longer has.
    pub fn with_stale_purge(mut self, enabled: bool) -> Self {
        self.purge_stale = enabled;
        self
    }

    /// List remote secrets, preferring the local `updated_at` when a row is cached.
    ///
    /// Remote metadata decides existence: cached rows with no remote
    /// counterpart are never returned. Local rows are read before the remote
    /// list so a row cached by a concurrent upsert is never mistaken for stale.
    pub async fn list(
        &self,
        remote: &dyn SecretGateway,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<MergedSecretView>, SyncError> {
        let local = self
            .store
            .list_by_repo(owner, repo)
            .await
            .map_err(SyncError::Store)?;
        let remote_secrets = remote.list_secret_metadata(owner, repo).await?;

        let local_updated: HashMap<&str, &str> = local
            .iter()
            .map(|s| (s.secret_name.as_str(), s.updated_at.as_str()))
            .collect();

        let merged: Vec<MergedSecretView> = remote_secrets
            .iter()
            .map(|secret| MergedSecretView {
                name: secret.name.clone(),
                created_at: secret.created_at.clone(),
                updated_at: local_updated
                    .get(secret.name.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| secret.updated_at.clone()),
            })
            .collect();

        if self.purge_stale {
            let remote_names: HashSet<&str> =
                remote_secrets.iter().map(|s| s.name.as_str()).collect();
            for stale in local
                .iter()
                .filter(|s| !remote_names.contains(s.secret_name.as_str()))
            {
                self.purge(stale).await;
            }
        }

        Ok(merged)
    }

    /// Drop a cached row the remote no longer knows about, unless it was
    /// rewritten after it was read. Failures are logged only.
    async fn purge(&self, stale: &Secret) {
        let (owner, repo, name) = (
            stale.repository_owner.as_str(),
            stale.repository_name.as_str(),
            stale.secret_name.as_str(),
        );
        match self
            .store
            .delete_if_unchanged(owner, repo, name, &stale.updated_at)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    "Kept cached secret {}/{}/{}: rewritten since listing",
                    owner,
                    repo,
                    name
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to purge stale secret {}/{}/{}: {}",
                    owner,
                    repo,
                    name,
                    e
                );
                return;
            }
        }
        tracing::info!(
            "Purged stale cached secret {}/{}/{} (absent remotely)",
            owner,
            repo,
            name
        );
        if let Err(e) = self
            .audit
            .append(owner, repo, name, AuditAction::Reconciled)
            .await
        {
            tracing::warn!("Failed to record reconciliation for {}: {}", name, e);
        }
    }

    /// Cached plaintext for a secret, or an empty string if nothing is cached.
    pub async fn read_value(&self, owner: &str, repo: &str, name: &str) -> Result<String, SyncError> {
        let secret = self
            .store
            .get(owner, repo, name)
            .await
            .map_err(SyncError::Store)?;
        Ok(secret.map(|s| s.secret_value).unwrap_or_default())
    }

    /// Seal and push a value to the remote store, then cache it locally.
    pub async fn upsert(
        &self,
        remote: &dyn SecretGateway,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<(), SyncError> {
        if name.is_empty() || value.is_empty() {
            return Err(SyncError::Validation(
                "Secret name and value are required".to_string(),
            ));
        }

        let recipient = remote.recipient_key(owner, repo).await?;
        let sealed = crypto::seal_base64(value, &recipient.key)?;
        remote
            .put_sealed_secret(owner, repo, name, &sealed, &recipient.key_id)
            .await?;

        tracing::info!("Updated remote secret {}/{}/{}", owner, repo, name);

        let cached = self.store.upsert(owner, repo, name, value).await.map(|_| ());
        self.record(owner, repo, name, AuditAction::Updated, cached)
            .await
    }

    /// Delete a secret remotely, then drop the cached row.
    pub async fn delete(
        &self,
        remote: &dyn SecretGateway,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<(), SyncError> {
        if name.is_empty() {
            return Err(SyncError::Validation("Secret name is required".to_string()));
        }

        remote.delete_secret(owner, repo, name).await?;

        tracing::info!("Deleted remote secret {}/{}/{}", owner, repo, name);

        let cached = self.store.delete(owner, repo, name).await;
        self.record(owner, repo, name, AuditAction::Deleted, cached)
            .await
    }

    /// Check the local mutation result and append its audit entry.
    ///
    /// Runs only after the remote write succeeded; errors here mean the remote
    /// changed but the cache may not have.
    async fn record(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        action: AuditAction,
        cached: Result<(), String>,
    ) -> Result<(), SyncError> {
        if let Err(e) = cached {
            tracing::error!(
                "Remote {} succeeded but local cache write failed for {}/{}/{}: {}",
                action,
                owner,
                repo,
                name,
                e
            );
            return Err(SyncError::Store(e));
        }

        self.audit
            .append(owner, repo, name, action)
            .await
            .map_err(|e| {
                tracing::error!("Failed to append audit entry for {}: {}", name, e);
                SyncError::Store(e)
            })?;
        Ok(())
    }

    /// Audit entries for a repository (optionally one secret), oldest first.
    pub async fn history(
        &self,
        owner: &str,
        repo: &str,
        name: Option<&str>,
    ) -> Result<Vec<AuditEntry>, SyncError> {
        self.audit
            .history(owner, repo, name)
            .await
            .map_err(SyncError::Store)
    }
}
