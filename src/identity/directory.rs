// HTTP identity collaborators: the auth-directory admin lookup (resolution
// tier 2), the alternate identity endpoint (tier 3), and bearer-token
// validation for the stamp write path.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("caption-feed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("identity endpoint transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity endpoint returned {0}")]
    Status(StatusCode),
}

/// What a lookup tier learned about one uploader id. Either side may be
/// missing; fully-empty results are reported as not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityRecord {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// One per-id lookup tier. Implementations report failures honestly; the
/// resolver decides that per-id failures mean "still unresolved".
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(&self, uploader_id: &str) -> Result<Option<IdentityRecord>, LookupError>;
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull email/name out of an auth-provider user payload. Tolerates both the
/// bare user object and the `{ "user": {...} }` envelope.
fn identity_from_user_json(body: &Value) -> Option<IdentityRecord> {
    let user = body.get("user").unwrap_or(body);
    let email = non_empty_str(user.get("email"));
    let name = non_empty_str(user.pointer("/user_metadata/full_name"))
        .or_else(|| non_empty_str(user.pointer("/user_metadata/name")))
        .or_else(|| non_empty_str(user.get("name")));
    if email.is_none() && name.is_none() {
        return None;
    }
    Some(IdentityRecord { email, name })
}

fn build_client(timeout_secs: u64) -> anyhow::Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Admin user lookup against the auth directory (service-role credential).
#[derive(Clone)]
pub struct AuthDirectory {
    base_url: String,
    service_key: String,
    http: Client,
}

impl AuthDirectory {
    pub fn new(base_url: &str, service_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            http: build_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl IdentityLookup for AuthDirectory {
    async fn lookup(&self, uploader_id: &str) -> Result<Option<IdentityRecord>, LookupError> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, uploader_id);
        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Ok(None),
            s => return Err(LookupError::Status(s)),
        }

        let body: Value = resp.json().await?;
        Ok(identity_from_user_json(&body))
    }
}

/// Alternate identity endpoint queried when the directory comes up empty.
#[derive(Clone)]
pub struct FallbackEndpoint {
    base_url: String,
    http: Client,
}

impl FallbackEndpoint {
    pub fn new(base_url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl IdentityLookup for FallbackEndpoint {
    async fn lookup(&self, uploader_id: &str) -> Result<Option<IdentityRecord>, LookupError> {
        let url = format!("{}/{}", self.base_url, uploader_id);
        let resp = self.http.get(&url).send().await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Ok(None),
            s => return Err(LookupError::Status(s)),
        }

        let body: Value = resp.json().await?;
        Ok(identity_from_user_json(&body))
    }
}

/// A user authenticated by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Validates end-user bearer tokens against the identity provider.
#[derive(Clone)]
pub struct AuthProvider {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl AuthProvider {
    pub fn new(base_url: &str, anon_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            http: build_client(timeout_secs)?,
        })
    }

    /// Ok(None) means the token was rejected; transport problems and
    /// unexpected statuses are real errors.
    pub async fn user_from_token(&self, token: &str) -> Result<Option<AuthUser>, LookupError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            s => return Err(LookupError::Status(s)),
        }

        let body: Value = resp.json().await?;
        let user = body.get("user").unwrap_or(&body);
        let id = non_empty_str(user.get("id"));
        let email = non_empty_str(user.get("email")).unwrap_or_default();
        match id {
            Some(id) => Ok(Some(AuthUser { id, email })),
            None => Ok(None),
        }
    }
}
