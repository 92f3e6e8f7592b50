//! Upstream response types.
//!
//! These model the JSON returned by the OAuth, CMS, and analytics services.
//! Every optional field defaults so that partially populated records still
//! deserialize; normalisation into domain types happens in the resolver and
//! fetchers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// Response from the client-credentials `access_token` endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds; absent on some deployments.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

// ---------------------------------------------------------------------------
// CMS
// ---------------------------------------------------------------------------

/// A video record from the CMS `videos` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CmsVideo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Lifecycle state: `ACTIVE`, `INACTIVE`, `PENDING`, `DELETED`.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Option<CmsImages>,
}

impl CmsVideo {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("ACTIVE"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CmsImages {
    #[serde(default)]
    pub thumbnail: Option<CmsImage>,
    #[serde(default)]
    pub poster: Option<CmsImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmsImage {
    #[serde(default)]
    pub src: Option<String>,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Envelope for the dimensional `data` endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub item_count: Option<u64>,
    #[serde(default)]
    pub items: Vec<AnalyticsRow>,
}

/// One row of a dimensional report. Only the requested fields are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsRow {
    #[serde(default)]
    pub video_view: Option<f64>,
    #[serde(default)]
    pub video_impression: Option<f64>,
    #[serde(default)]
    pub engagement_score: Option<f64>,
    #[serde(default)]
    pub play_rate: Option<f64>,
    #[serde(default)]
    pub video_seconds_viewed: Option<f64>,
    #[serde(default)]
    pub destination_domain: Option<String>,
    #[serde(default)]
    pub destination_path: Option<String>,
}

/// Response from the all-time views summary endpoint.
#[derive(Debug, Deserialize)]
pub struct AllTimeViewsResponse {
    #[serde(default)]
    pub alltime_video_views: Option<f64>,
}
