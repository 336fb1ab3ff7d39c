use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::AuthConfig;

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
// Issuers advertising longer lifetimes are still refreshed at least daily.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 3600;

/// Bearer token plus the instant the issuer stops honoring it.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl BearerCredential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True while `now < expires_at - safety_margin`.
    pub fn is_fresh(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        let Ok(margin) = chrono::Duration::from_std(safety_margin) else {
            return false;
        };
        match self.expires_at.checked_sub_signed(margin) {
            Some(usable_until) => now < usable_until,
            None => false,
        }
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("token request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("token response malformed: {0}")]
    Malformed(String),
}

/// Source of bearer credentials for the editing service.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<BearerCredential, CredentialError>;
}

/// Process-wide credential slot. Check-and-refresh runs under one async lock,
/// so concurrent callers that find the slot stale trigger a single refresh.
pub struct CredentialCache {
    provider: Arc<dyn TokenProvider>,
    safety_margin: Duration,
    slot: Mutex<Option<BearerCredential>>,
}

impl CredentialCache {
    pub fn new(provider: Arc<dyn TokenProvider>, safety_margin: Duration) -> Self {
        Self {
            provider,
            safety_margin,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached token, refreshing it first when missing or near expiry.
    pub async fn bearer(&self) -> Result<String, CredentialError> {
        let mut slot = self.slot.lock().await;
        let now = Utc::now();

        if let Some(credential) = slot.as_ref() {
            if credential.is_fresh(now, self.safety_margin) {
                return Ok(credential.token.clone());
            }
        }

        tracing::debug!("refreshing editing service credential");
        let credential = self.provider.fetch_token().await?;
        if !credential.is_fresh(Utc::now(), self.safety_margin) {
            tracing::warn!(
                expires_at = %credential.expires_at,
                "issued credential expires inside the safety margin"
            );
        }
        let token = credential.token.clone();
        *slot = Some(credential);
        Ok(token)
    }

    /// Drops the cached credential so the next call fetches a new one.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

impl fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCache")
            .field("safety_margin", &self.safety_margin)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth `client_credentials` grant against an IMS-style token endpoint.
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl ClientCredentialsProvider {
    pub fn new(http: reqwest::Client, config: &AuthConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        }
    }
}

impl fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn fetch_token(&self) -> Result<BearerCredential, CredentialError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|err| CredentialError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::Malformed(err.to_string()))?;

        let expires_at = expiry_after(Utc::now(), payload.expires_in)?;
        Ok(BearerCredential::new(payload.access_token, expires_at))
    }
}

/// `expires_in` clamped to `0..=MAX_TOKEN_LIFETIME_SECS`, added to `now`.
fn expiry_after(
    now: DateTime<Utc>,
    expires_in: Option<i64>,
) -> Result<DateTime<Utc>, CredentialError> {
    let lifetime = expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    chrono::Duration::try_seconds(lifetime)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| CredentialError::Malformed(format!("unusable expires_in {lifetime}")))
}
