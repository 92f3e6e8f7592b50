//! HTTP client for the CMS and analytics REST APIs.
//!
//! Wraps `reqwest` with bearer authentication, status classification, and
//! typed response deserialization. Every request runs under the client's
//! [`RetryPolicy`], so transient failures (429, 408, 5xx, timeouts) are
//! retried before an error is surfaced.

use std::time::Duration;

use mediastat_core::{AppConfig, DateRange};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{AllTimeViewsResponse, AnalyticsResponse, AnalyticsRow, CmsVideo};

/// Base URLs of the three upstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub oauth: String,
    pub cms: String,
    pub analytics: String,
}

impl Endpoints {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            oauth: config.oauth_url.clone(),
            cms: config.cms_url.clone(),
            analytics: config.analytics_url.clone(),
        }
    }

    /// All three services mounted under one host at `/oauth`, `/cms`, and
    /// `/analytics` (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            oauth: format!("{base}/oauth"),
            cms: format!("{base}/cms"),
            analytics: format!("{base}/analytics"),
        }
    }
}

/// Builds the shared `reqwest::Client` used by the API client and the
/// token provider.
///
/// # Errors
///
/// Returns [`ApiError::Http`] if the underlying client cannot be constructed.
pub fn build_http_client(timeout_secs: u64, user_agent: &str) -> Result<Client, ApiError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// Parses a base URL, dropping any trailing slash so path segments append
/// cleanly.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let normalised = raw.trim_end_matches('/');
    Url::parse(normalised).map_err(|e| ApiError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Maps a non-2xx response to a typed error; passes 2xx responses through.
pub(crate) fn check_status(response: Response, url: &Url) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = url.to_string();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { url },
        StatusCode::NOT_FOUND => ApiError::NotFound { url },
        other => ApiError::UnexpectedStatus {
            status: other.as_u16(),
            url,
        },
    })
}

/// Client for the CMS and analytics APIs of one account.
///
/// Use [`ApiClient::from_config`] for production or [`ApiClient::new`] with
/// [`Endpoints::with_base_url`] to point at a mock server in tests.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    account_id: String,
    cms_base: Url,
    analytics_base: Url,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Creates a client for `account_id` against the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if an endpoint is not a valid URL.
    pub fn new(
        http: Client,
        account_id: &str,
        endpoints: &Endpoints,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            account_id: account_id.to_owned(),
            cms_base: parse_base_url(&endpoints.cms)?,
            analytics_base: parse_base_url(&endpoints.analytics)?,
            retry,
        })
    }

    /// Creates a client from application config, sharing `http` with the
    /// token provider.
    ///
    /// # Errors
    ///
    /// - [`ApiError::AuthConfig`] if no account id is configured.
    /// - [`ApiError::InvalidBaseUrl`] if an endpoint is not a valid URL.
    pub fn from_config(http: Client, config: &AppConfig) -> Result<Self, ApiError> {
        let account_id = config
            .account_id
            .as_deref()
            .ok_or_else(|| ApiError::AuthConfig("MEDIASTAT_ACCOUNT_ID".to_owned()))?;
        Self::new(
            http,
            account_id,
            &Endpoints::from_config(config),
            RetryPolicy::new(config.max_retries, config.retry_backoff_base_ms),
        )
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Fetches one catalog item by id.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotFound`] if the item does not exist.
    /// - [`ApiError::Http`], [`ApiError::RateLimited`], or
    ///   [`ApiError::UnexpectedStatus`] once retries are exhausted.
    /// - [`ApiError::Deserialize`] if the body does not match [`CmsVideo`].
    pub async fn get_video(&self, id: &str, token: &str) -> Result<CmsVideo, ApiError> {
        let url = self.video_url(id);
        self.get_json(&url, token, &format!("video(id={id})")).await
    }

    /// Fetches one page of a filtered catalog search.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get_video`].
    pub async fn search_videos(
        &self,
        filter: &str,
        token: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CmsVideo>, ApiError> {
        let mut url = join_segments(
            &self.cms_base,
            &["accounts", self.account_id.as_str(), "videos"],
        );
        url.query_pairs_mut()
            .append_pair("q", filter)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("sort", "-created_at");
        self.get_json(&url, token, &format!("videos(offset={offset})"))
            .await
    }

    /// Reads the lifetime view count for an item from the summary endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get_video`].
    pub async fn alltime_views(&self, id: &str, token: &str) -> Result<f64, ApiError> {
        let url = join_segments(
            &self.analytics_base,
            &["alltime", "accounts", self.account_id.as_str(), "videos", id],
        );
        let body: AllTimeViewsResponse = self
            .get_json(&url, token, &format!("alltime(id={id})"))
            .await?;
        Ok(body.alltime_video_views.unwrap_or(0.0))
    }

    /// Runs a dimensional report filtered to one item over `window`.
    ///
    /// `extra` carries optional parameters such as `sort` and `limit`.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get_video`].
    pub async fn analytics_rows(
        &self,
        id: &str,
        token: &str,
        window: &DateRange,
        dimensions: &str,
        fields: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<AnalyticsRow>, ApiError> {
        let url = self.analytics_url(id, window, dimensions, fields, extra);
        let body: AnalyticsResponse = self
            .get_json(&url, token, &format!("data(id={id}, dimensions={dimensions})"))
            .await?;
        Ok(body.items)
    }

    fn video_url(&self, id: &str) -> Url {
        join_segments(
            &self.cms_base,
            &["accounts", self.account_id.as_str(), "videos", id],
        )
    }

    fn analytics_url(
        &self,
        id: &str,
        window: &DateRange,
        dimensions: &str,
        fields: &str,
        extra: &[(&str, &str)],
    ) -> Url {
        let mut url = join_segments(&self.analytics_base, &["data"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("accounts", &self.account_id);
            pairs.append_pair("dimensions", dimensions);
            pairs.append_pair("where", &format!("video=={id}"));
            pairs.append_pair("fields", fields);
            match window.bounds() {
                None => {
                    pairs.append_pair("from", "alltime");
                }
                Some((from, to)) => {
                    pairs.append_pair("from", &from.to_string());
                    pairs.append_pair("to", &to.to_string());
                }
            }
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends an authenticated GET under the retry policy.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
        context: &str,
    ) -> Result<T, ApiError> {
        retry_with_backoff(&self.retry, ApiError::is_retriable, || {
            self.get_json_once(url, token, context)
        })
        .await
    }

    /// One authenticated GET: classifies the status and parses the body as `T`.
    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &str,
        context: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response, url)?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
