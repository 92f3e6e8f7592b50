//! Referring-page breakdown for one item.

use mediastat_core::{DateRange, ViewSource};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::AnalyticsRow;

/// Maximum breakdown rows requested per item.
pub const MAX_SOURCE_ROWS: usize = 100;

const SOURCE_DIMENSIONS: &str = "destination_domain,destination_path";

impl ApiClient {
    /// Fetches the destination breakdown for one item over `window`, most
    /// viewed first.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the breakdown read once its retries are
    /// exhausted. The batch pipeline degrades this to an empty list.
    pub async fn fetch_view_sources(
        &self,
        id: &str,
        token: &str,
        window: &DateRange,
    ) -> Result<Vec<ViewSource>, ApiError> {
        let limit = MAX_SOURCE_ROWS.to_string();
        let rows = self
            .analytics_rows(
                id,
                token,
                window,
                SOURCE_DIMENSIONS,
                "video_view",
                &[("sort", "-video_view"), ("limit", limit.as_str())],
            )
            .await?;
        Ok(rank_sources(rows))
    }
}

/// Converts breakdown rows into sources sorted by descending views, dropping
/// rows without a domain.
#[must_use]
pub fn rank_sources(rows: Vec<AnalyticsRow>) -> Vec<ViewSource> {
    let mut sources: Vec<ViewSource> = rows
        .into_iter()
        .take(MAX_SOURCE_ROWS)
        .filter_map(|row| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let views = row.video_view.unwrap_or(0.0).max(0.0) as u64;
            ViewSource::from_parts(
                row.destination_domain.as_deref(),
                row.destination_path.as_deref(),
                views,
            )
        })
        .collect();
    sources.sort_by(|a, b| b.views.cmp(&a.views));
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(domain: Option<&str>, path: Option<&str>, views: f64) -> AnalyticsRow {
        AnalyticsRow {
            video_view: Some(views),
            destination_domain: domain.map(str::to_owned),
            destination_path: path.map(str::to_owned),
            ..AnalyticsRow::default()
        }
    }

    #[test]
    fn builds_urls_and_sorts_by_views() {
        let sources = rank_sources(vec![
            row(Some("b.com"), Some(""), 2.0),
            row(Some("a.com"), Some("/x"), 5.0),
        ]);
        assert_eq!(
            sources,
            vec![
                ViewSource {
                    url: "https://a.com/x".to_owned(),
                    views: 5
                },
                ViewSource {
                    url: "https://b.com/".to_owned(),
                    views: 2
                },
            ]
        );
    }

    #[test]
    fn drops_rows_without_domain() {
        let sources = rank_sources(vec![
            row(None, Some("/orphan"), 50.0),
            row(Some("a.com"), None, 1.0),
        ]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://a.com/");
    }

    #[test]
    fn relative_paths_gain_a_leading_slash() {
        let sources = rank_sources(vec![row(Some("a.com"), Some("blog/post"), 3.0)]);
        assert_eq!(sources[0].url, "https://a.com/blog/post");
    }

    #[test]
    fn empty_rows_give_empty_list() {
        assert!(rank_sources(Vec::new()).is_empty());
    }
}
