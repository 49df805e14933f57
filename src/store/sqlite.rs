//! SQLite-backed secret cache and audit log.

use super::{now_string, AuditAction, AuditEntry, AuditLog, Secret, SecretStore};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS secrets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    secret_name TEXT NOT NULL,
    secret_value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(repository_owner, repository_name, secret_name)
);

CREATE TABLE IF NOT EXISTS secret_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_owner TEXT NOT NULL,
    repository_name TEXT NOT NULL,
    secret_name TEXT NOT NULL,
    action TEXT NOT NULL,
    performed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_repo ON secret_history(repository_owner, repository_name, id);
"#;

const SECRET_COLUMNS: &str =
    "repository_owner, repository_name, secret_name, secret_value, created_at, updated_at";

pub struct SqliteSecretStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSecretStore {
    /// Open (or create) `secrets.db` inside `base_dir`.
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create data dir: {}", e))?;
        Self::open(base_dir.join("secrets.db")).await
    }

    /// Open a database file at an explicit path.
    pub async fn open(db_path: PathBuf) -> Result<Self, String> {
        let display_path = db_path.display().to_string();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;
            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        tracing::info!("Secret store opened at {}", display_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn secret_from_row(row: &Row<'_>) -> rusqlite::Result<Secret> {
    Ok(Secret {
        repository_owner: row.get(0)?,
        repository_name: row.get(1)?,
        secret_name: row.get(2)?,
        secret_value: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let action: String = row.get(4)?;
    let action = AuditAction::parse(&action).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown audit action '{}'", action).into(),
        )
    })?;
    Ok(AuditEntry {
        id: row.get(0)?,
        repository_owner: row.get(1)?,
        repository_name: row.get(2)?,
        secret_name: row.get(3)?,
        action,
        performed_at: row.get(5)?,
    })
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get(&self, owner: &str, repo: &str, name: &str) -> Result<Option<Secret>, String> {
        let conn = self.conn.clone();
        let (owner, repo, name) = (owner.to_string(), repo.to_string(), name.to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM secrets
                     WHERE repository_owner = ?1 AND repository_name = ?2 AND secret_name = ?3",
                    SECRET_COLUMNS
                ),
                params![owner, repo, name],
                secret_from_row,
            )
            .optional()
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn list_by_repo(&self, owner: &str, repo: &str) -> Result<Vec<Secret>, String> {
        let conn = self.conn.clone();
        let (owner, repo) = (owner.to_string(), repo.to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM secrets
                     WHERE repository_owner = ?1 AND repository_name = ?2
                     ORDER BY secret_name",
                    SECRET_COLUMNS
                ))
                .map_err(|e| e.to_string())?;

            let secrets = stmt
                .query_map(params![owner, repo], secret_from_row)
                .map_err(|e| e.to_string())?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())?;

            Ok(secrets)
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn upsert(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<Secret, String> {
        let conn = self.conn.clone();
        let now = now_string();
        let (owner, repo, name, value) = (
            owner.to_string(),
            repo.to_string(),
            name.to_string(),
            value.to_string(),
        );

        // Single statement: the conflict clause makes insert-or-update atomic.
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                &format!(
                    "INSERT INTO secrets ({cols})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(repository_owner, repository_name, secret_name)
                     DO UPDATE SET secret_value = excluded.secret_value,
                                   updated_at = excluded.updated_at
                     RETURNING {cols}",
                    cols = SECRET_COLUMNS
                ),
                params![owner, repo, name, value, now],
                secret_from_row,
            )
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn delete(&self, owner: &str, repo: &str, name: &str) -> Result<(), String> {
        let conn = self.conn.clone();
        let (owner, repo, name) = (owner.to_string(), repo.to_string(), name.to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM secrets
                 WHERE repository_owner = ?1 AND repository_name = ?2 AND secret_name = ?3",
                params![owner, repo, name],
            )
            .map_err(|e| e.to_string())?;
            Ok(())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn delete_if_unchanged(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        updated_at: &str,
    ) -> Result<bool, String> {
        let conn = self.conn.clone();
        let (owner, repo, name, updated_at) = (
            owner.to_string(),
            repo.to_string(),
            name.to_string(),
            updated_at.to_string(),
        );

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let removed = conn
                .execute(
                    "DELETE FROM secrets
                     WHERE repository_owner = ?1 AND repository_name = ?2 AND secret_name = ?3
                       AND updated_at = ?4",
                    params![owner, repo, name, updated_at],
                )
                .map_err(|e| e.to_string())?;
            Ok(removed > 0)
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[async_trait]
impl AuditLog for SqliteSecretStore {
    async fn append(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        action: AuditAction,
    ) -> Result<AuditEntry, String> {
        let conn = self.conn.clone();
        let now = now_string();
        let (owner, repo, name) = (owner.to_string(), repo.to_string(), name.to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO secret_history
                     (repository_owner, repository_name, secret_name, action, performed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![owner, repo, name, action.as_str(), now],
            )
            .map_err(|e| e.to_string())?;

            Ok(AuditEntry {
                id: conn.last_insert_rowid(),
                repository_owner: owner,
                repository_name: repo,
                secret_name: name,
                action,
                performed_at: now,
            })
        })
        .await
        .map_err(|e| e.to_string())?
    }

    async fn history(
        &self,
        owner: &str,
        repo: &str,
        name: Option<&str>,
    ) -> Result<Vec<AuditEntry>, String> {
        let conn = self.conn.clone();
        let (owner, repo) = (owner.to_string(), repo.to_string());
        let name = name.map(|s| s.to_string());

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, repository_owner, repository_name, secret_name, action, performed_at
                     FROM secret_history
                     WHERE repository_owner = ?1 AND repository_name = ?2
                       AND (?3 IS NULL OR secret_name = ?3)
                     ORDER BY id",
                )
                .map_err(|e| e.to_string())?;

            let entries = stmt
                .query_map(params![owner, repo, name], audit_from_row)
                .map_err(|e| e.to_string())?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())?;

            Ok(entries)
        })
        .await
        .map_err(|e| e.to_string())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, SqliteSecretStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSecretStore::new(dir.path().to_path_buf())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let (_dir, store) = test_store().await;

        let first = store.upsert("acme", "widgets", "API_KEY", "one").await.unwrap();
        assert_eq!(first.secret_value, "one");
        assert_eq!(first.created_at, first.updated_at);

        let second = store.upsert("acme", "widgets", "API_KEY", "two").await.unwrap();
        assert_eq!(second.secret_value, "two");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);

        let rows = store.list_by_repo("acme", "widgets").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], second);
    }

    #[tokio::test]
    async fn test_get_scoped_by_full_key() {
        let (_dir, store) = test_store().await;
        store.upsert("acme", "widgets", "TOKEN", "a").await.unwrap();
        store.upsert("acme", "gadgets", "TOKEN", "b").await.unwrap();
        store.upsert("other", "widgets", "TOKEN", "c").await.unwrap();

        let found = store.get("acme", "gadgets", "TOKEN").await.unwrap().unwrap();
        assert_eq!(found.secret_value, "b");
        assert!(store.get("acme", "widgets", "MISSING").await.unwrap().is_none());

        let listed = store.list_by_repo("acme", "widgets").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].secret_value, "a");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = test_store().await;
        store.upsert("acme", "widgets", "API_KEY", "v").await.unwrap();

        store.delete("acme", "widgets", "API_KEY").await.unwrap();
        store.delete("acme", "widgets", "API_KEY").await.unwrap();
        store.delete("acme", "widgets", "NEVER_SET").await.unwrap();

        assert!(store.get("acme", "widgets", "API_KEY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_if_unchanged_skips_rewritten_row() {
        let (_dir, store) = test_store().await;
        let first = store.upsert("acme", "widgets", "API_KEY", "one").await.unwrap();
        let second = store.upsert("acme", "widgets", "API_KEY", "two").await.unwrap();

        assert!(!store
            .delete_if_unchanged("acme", "widgets", "API_KEY", &first.updated_at)
            .await
            .unwrap());
        assert!(store.get("acme", "widgets", "API_KEY").await.unwrap().is_some());

        assert!(store
            .delete_if_unchanged("acme", "widgets", "API_KEY", &second.updated_at)
            .await
            .unwrap());
        assert!(store.get("acme", "widgets", "API_KEY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteSecretStore::new(dir.path().to_path_buf())
                .await
                .unwrap();
            store.upsert("acme", "widgets", "API_KEY", "kept").await.unwrap();
            store
                .append("acme", "widgets", "API_KEY", AuditAction::Updated)
                .await
                .unwrap();
        }

        let reopened = SqliteSecretStore::new(dir.path().to_path_buf())
            .await
            .unwrap();
        assert!(reopened.is_persistent());
        let secret = reopened.get("acme", "widgets", "API_KEY").await.unwrap().unwrap();
        assert_eq!(secret.secret_value, "kept");
        let history = reopened.history("acme", "widgets", None).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_preserves_append_order() {
        let (_dir, store) = test_store().await;
        let actions = [
            AuditAction::Updated,
            AuditAction::Updated,
            AuditAction::Deleted,
            AuditAction::Updated,
        ];
        for action in actions {
            store.append("acme", "widgets", "API_KEY", action).await.unwrap();
        }
        store
            .append("acme", "widgets", "OTHER", AuditAction::Reconciled)
            .await
            .unwrap();

        let history = store
            .history("acme", "widgets", Some("API_KEY"))
            .await
            .unwrap();
        let recorded: Vec<_> = history.iter().map(|e| e.action).collect();
        assert_eq!(recorded, actions);
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));

        let all = store.history("acme", "widgets", None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].action, AuditAction::Reconciled);
    }
}
