//! OAuth2 client-credential token acquisition for the CRM.
//!
//! Tokens are cached per credential set and dropped from the cache
//! [`TOKEN_REFRESH_SKEW`] before they actually expire, so every CRM call made
//! through [`TokenProvider::get_access_token`] carries a token with at least
//! that much lifetime left. Concurrent callers that miss the cache share one
//! in-flight request to the token endpoint.

use crate::config::Config;
use crate::errors::AppError;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// How long before expiry a cached token stops being handed out.
pub const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3599;

/// Upper bound on how long a token is cached, whatever the authority claims.
const MAX_TOKEN_LIFETIME_SECS: u64 = 24 * 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// A bearer token together with its lifetime as reported by the authority.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
    lifetime: Duration,
}

struct TokenExpiry {
    skew: Duration,
}

impl Expiry<String, AccessToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &AccessToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.lifetime.saturating_sub(self.skew))
    }
}

/// Exchanges the configured client credentials for CRM bearer tokens.
#[derive(Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache_key: String,
    cache: Cache<String, AccessToken>,
}

impl TokenProvider {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        let token_url = config.token_url();
        let scope = config.token_scope();
        let cache_key = credential_key(&token_url, &config.client_id, &scope);

        let cache = Cache::builder()
            .max_capacity(16)
            .expire_after(TokenExpiry {
                skew: TOKEN_REFRESH_SKEW,
            })
            .build();

        Self {
            client,
            token_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope,
            cache_key,
            cache,
        }
    }

    /// Returns a bearer token for the CRM, fetching a new one when the cached
    /// token is missing or close to expiry.
    pub async fn get_access_token(&self) -> Result<String, AppError> {
        let token = self
            .cache
            .try_get_with(self.cache_key.clone(), self.fetch_token())
            .await
            .map_err(|e| (*e).clone())?;

        Ok(token.secret)
    }

    /// Forgets the cached token so the next call goes to the authority.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.cache_key).await;
    }

    async fn fetch_token(&self) -> Result<AccessToken, AppError> {
        tracing::debug!("Requesting access token for client {}", self.client_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::AuthError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Error fetching access token: {} {}", status, error_text);
            return Err(AppError::AuthError(format!(
                "Token endpoint returned {}: {}",
                status,
                describe_token_error(&error_text)
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            AppError::AuthError(format!("Failed to parse token response: {}", e))
        })?;

        let secret = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::AuthError("Token response missing 'access_token' field".to_string())
            })?;

        let lifetime = Duration::from_secs(
            body.expires_in
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
                .min(MAX_TOKEN_LIFETIME_SECS),
        );
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or_else(Utc::now);

        tracing::info!("Access token acquired, expires at {}", expires_at);

        Ok(AccessToken {
            secret,
            expires_at,
            lifetime,
        })
    }
}

/// Stable cache key for one credential set; the secret itself is not part of it.
fn credential_key(token_url: &str, client_id: &str, scope: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(client_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(scope.as_bytes());
    hex::encode(hasher.finalize())
}

fn describe_token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenErrorResponse {
            error: Some(error), ..
        }) => error,
        _ => body.to_string(),
    }
}
