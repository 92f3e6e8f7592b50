//! Client-credentials token exchange with an in-process cache.
//!
//! [`TokenProvider`] is the one piece of shared mutable state in a batch.
//! Refresh is not single-flighted: callers that find the cache stale at the
//! same moment each run an exchange and the last write wins. The exchange has
//! no side effects, so the cost is redundant requests, not wrong tokens.

use chrono::{DateTime, Duration, Utc};
use mediastat_core::AppConfig;
use reqwest::{Client, Url};
use tokio::sync::RwLock;

use crate::client::{check_status, join_segments, parse_base_url};
use crate::error::ApiError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::TokenResponse;

/// Minimum remaining validity for a cached token to be handed out.
const REFRESH_MARGIN_SECS: i64 = 30;
/// Lifetime assumed when the exchange response omits `expires_in`.
const DEFAULT_TTL_SECS: u64 = 300;
/// Upper bound on a cached token's lifetime.
const MAX_TTL_SECS: u64 = 86_400;

/// A bearer credential and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// `true` if the token stays valid for at least 30 more seconds.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now >= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Account and client credentials for the exchange.
#[derive(Clone, Default)]
pub struct Credentials {
    pub account_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            account_id: config.account_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Exchanges client credentials for bearer tokens and caches the result.
///
/// Share one instance per process (behind an `Arc`) and pass it to every
/// caller that needs a credential.
pub struct TokenProvider {
    http: Client,
    token_url: Url,
    credentials: Credentials,
    retry: RetryPolicy,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    /// Creates a provider that exchanges at `{oauth_url}/access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if `oauth_url` is not a valid URL.
    pub fn new(
        http: Client,
        oauth_url: &str,
        credentials: Credentials,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let token_url = join_segments(&parse_base_url(oauth_url)?, &["access_token"]);
        Ok(Self {
            http,
            token_url,
            credentials,
            retry,
            cached: RwLock::new(None),
        })
    }

    /// Creates a provider from application config, sharing `http` with the
    /// API client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the OAuth URL is invalid.
    pub fn from_config(http: Client, config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(
            http,
            &config.oauth_url,
            Credentials::from_config(config),
            RetryPolicy::new(config.max_retries, config.retry_backoff_base_ms),
        )
    }

    /// Returns a bearer token valid for at least 30 more seconds, exchanging
    /// credentials when the cache is empty or close to expiry.
    ///
    /// # Errors
    ///
    /// - [`ApiError::AuthConfig`] if the account id, client id, or client
    ///   secret is missing.
    /// - [`ApiError::AuthExchange`] if the exchange is rejected or exhausts
    ///   its retries.
    pub async fn get_token(&self) -> Result<String, ApiError> {
        let (client_id, client_secret) = self.require_credentials()?;

        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.refresh(client_id, client_secret).await?;
        let value = token.value.clone();
        *self.cached.write().await = Some(token);
        Ok(value)
    }

    /// The currently cached token, if any.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.read().await.clone()
    }

    fn require_credentials(&self) -> Result<(&str, &str), ApiError> {
        let missing = |var: &str| ApiError::AuthConfig(var.to_owned());
        self.credentials
            .account_id
            .as_deref()
            .ok_or_else(|| missing("MEDIASTAT_ACCOUNT_ID"))?;
        let client_id = self
            .credentials
            .client_id
            .as_deref()
            .ok_or_else(|| missing("MEDIASTAT_CLIENT_ID"))?;
        let client_secret = self
            .credentials
            .client_secret
            .as_deref()
            .ok_or_else(|| missing("MEDIASTAT_CLIENT_SECRET"))?;
        Ok((client_id, client_secret))
    }

    async fn refresh(&self, client_id: &str, client_secret: &str) -> Result<AccessToken, ApiError> {
        let response = retry_with_backoff(&self.retry, ApiError::is_retriable, || {
            self.exchange(client_id, client_secret)
        })
        .await
        .map_err(|e| ApiError::AuthExchange(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let ttl = response
            .expires_in
            .unwrap_or(DEFAULT_TTL_SECS)
            .min(MAX_TTL_SECS) as i64;
        let expires_at = Utc::now() + Duration::seconds(ttl);
        tracing::debug!(
            ttl_secs = ttl,
            %expires_at,
            "exchanged client credentials for access token"
        );

        Ok(AccessToken {
            value: response.access_token,
            expires_at,
        })
    }

    async fn exchange(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = check_status(response, &self.token_url)?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: "access_token".to_owned(),
            source: e,
        })
    }

    #[cfg(test)]
    async fn seed(&self, token: AccessToken) {
        *self.cached.write().await = Some(token);
    }
}
