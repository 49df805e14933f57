//! GitHub REST client for Actions repository secrets.
//!
//! Every request forwards the caller's bearer token; this service holds no
//! GitHub credentials of its own.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use urlencoding::encode;

use super::{RecipientKey, RemoteError, RemoteSecretMetadata, SecretGateway};

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("secret-sync/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct SecretsPage {
    total_count: usize,
    secrets: Vec<RemoteSecretMetadata>,
}

/// GitHub API client bound to one caller's token.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    /// Create a client. `client` is shared so connections are pooled across requests.
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.base_url, encode(owner), encode(repo))
    }

    fn secret_url(&self, owner: &str, repo: &str, name: &str) -> String {
        format!(
            "{}/actions/secrets/{}",
            self.repo_url(owner, repo),
            encode(name)
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, RemoteError> {
        let resp = Self::send(self.request(Method::GET, url)).await?;
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// `GET /user`; succeeds only for a valid token.
    pub async fn authenticated_user(&self) -> Result<Value, RemoteError> {
        self.get_json(format!("{}/user", self.base_url)).await
    }

    /// Repositories visible to the token, most recently updated first.
    pub async fn list_repositories(&self) -> Result<Value, RemoteError> {
        self.get_json(format!(
            "{}/user/repos?per_page={}&sort=updated",
            self.base_url, PAGE_SIZE
        ))
        .await
    }
}

/// Pull GitHub's `message` field out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl SecretGateway for GitHubClient {
    async fn recipient_key(&self, owner: &str, repo: &str) -> Result<RecipientKey, RemoteError> {
        self.get_json(format!(
            "{}/actions/secrets/public-key",
            self.repo_url(owner, repo)
        ))
        .await
    }

    async fn list_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RemoteSecretMetadata>, RemoteError> {
        let mut secrets = Vec::new();
        let mut page = 1;

        loop {
            let batch: SecretsPage = self
                .get_json(format!(
                    "{}/actions/secrets?per_page={}&page={}",
                    self.repo_url(owner, repo),
                    PAGE_SIZE,
                    page
                ))
                .await?;

            let fetched = batch.secrets.len();
            secrets.extend(batch.secrets);
            if fetched < PAGE_SIZE || secrets.len() >= batch.total_count {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Fetched {} remote secrets for {}/{}",
            secrets.len(),
            owner,
            repo
        );
        Ok(secrets)
    }

    async fn put_sealed_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        sealed_value_b64: &str,
        key_id: &str,
    ) -> Result<(), RemoteError> {
        let body = serde_json::json!({
            "encrypted_value": sealed_value_b64,
            "key_id": key_id,
        });
        Self::send(
            self.request(Method::PUT, self.secret_url(owner, repo, name))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_secret(&self, owner: &str, repo: &str, name: &str) -> Result<(), RemoteError> {
        Self::send(self.request(Method::DELETE, self.secret_url(owner, repo, name))).await?;
        Ok(())
    }
}
