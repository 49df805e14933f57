//! In-memory secret cache and audit log (non-persistent).

use super::{now_string, AuditAction, AuditEntry, AuditLog, Secret, SecretStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type SecretKey = (String, String, String);

fn key(owner: &str, repo: &str, name: &str) -> SecretKey {
    (owner.to_string(), repo.to_string(), name.to_string())
}

#[derive(Clone)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<BTreeMap<SecretKey, Secret>>>,
    history: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Arc::new(RwLock::new(BTreeMap::new())),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn get(&self, owner: &str, repo: &str, name: &str) -> Result<Option<Secret>, String> {
        Ok(self.secrets.read().await.get(&key(owner, repo, name)).cloned())
    }

    async fn list_by_repo(&self, owner: &str, repo: &str) -> Result<Vec<Secret>, String> {
        // BTreeMap ordering keeps rows sorted by name within a repository.
        Ok(self
            .secrets
            .read()
            .await
            .values()
            .filter(|s| s.repository_owner == owner && s.repository_name == repo)
            .cloned()
            .collect())
    }

    async fn upsert(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<Secret, String> {
        let now = now_string();
        let mut secrets = self.secrets.write().await;
        let secret = secrets
            .entry(key(owner, repo, name))
            .and_modify(|s| {
                s.secret_value = value.to_string();
                s.updated_at = now.clone();
            })
            .or_insert_with(|| Secret {
                repository_owner: owner.to_string(),
                repository_name: repo.to_string(),
                secret_name: name.to_string(),
                secret_value: value.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
            });
        Ok(secret.clone())
    }

    async fn delete(&self, owner: &str, repo: &str, name: &str) -> Result<(), String> {
        self.secrets.write().await.remove(&key(owner, repo, name));
        Ok(())
    }

    async fn delete_if_unchanged(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        updated_at: &str,
    ) -> Result<bool, String> {
        let mut secrets = self.secrets.write().await;
        let key = key(owner, repo, name);
        match secrets.get(&key) {
            Some(s) if s.updated_at == updated_at => {
                secrets.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AuditLog for InMemorySecretStore {
    async fn append(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        action: AuditAction,
    ) -> Result<AuditEntry, String> {
        let mut history = self.history.write().await;
        let entry = AuditEntry {
            id: history.len() as i64 + 1,
            repository_owner: owner.to_string(),
            repository_name: repo.to_string(),
            secret_name: name.to_string(),
            action,
            performed_at: now_string(),
        };
        history.push(entry.clone());
        Ok(entry)
    }

    async fn history(
        &self,
        owner: &str,
        repo: &str,
        name: Option<&str>,
    ) -> Result<Vec<AuditEntry>, String> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|e| e.repository_owner == owner && e.repository_name == repo)
            .filter(|e| name.map_or(true, |n| e.secret_name == n))
            .cloned()
            .collect())
    }
}
