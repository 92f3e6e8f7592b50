//! Per-item analytics for one reporting window.

use chrono::Utc;
use mediastat_core::types::daily_average;
use mediastat_core::{AnalyticsRecord, DateRange, Metric};

use crate::catalog::UNTITLED;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{AnalyticsRow, CmsVideo};

const VIEW_FIELDS: &str = "video_view";
const AUX_FIELDS: &str = "video_impression,engagement_score,play_rate,video_seconds_viewed";

impl ApiClient {
    /// Fetches metadata, views, and auxiliary metrics for one item and
    /// derives its [`AnalyticsRecord`].
    ///
    /// The three reads run concurrently and the record is assembled once all
    /// of them have settled.
    ///
    /// # Errors
    ///
    /// Returns the first [`ApiError`] among the three reads (metadata, views,
    /// auxiliary) once that read's retries are exhausted. Falling back to an
    /// unavailable record is the caller's concern.
    pub async fn fetch_metrics(
        &self,
        id: &str,
        token: &str,
        window: &DateRange,
    ) -> Result<AnalyticsRecord, ApiError> {
        let (metadata, views, aux) = tokio::join!(
            self.get_video(id, token),
            self.fetch_views(id, token, window),
            self.fetch_aux_row(id, token, window),
        );
        let metadata = metadata?;
        let views = views?;
        let aux = aux?;

        Ok(build_record(&metadata, views, &aux, window))
    }

    async fn fetch_views(
        &self,
        id: &str,
        token: &str,
        window: &DateRange,
    ) -> Result<f64, ApiError> {
        if window.is_all_time() {
            return self.alltime_views(id, token).await;
        }
        let rows = self
            .analytics_rows(id, token, window, "video", VIEW_FIELDS, &[])
            .await?;
        Ok(rows.first().and_then(|row| row.video_view).unwrap_or(0.0))
    }

    async fn fetch_aux_row(
        &self,
        id: &str,
        token: &str,
        window: &DateRange,
    ) -> Result<AnalyticsRow, ApiError> {
        let rows = self
            .analytics_rows(id, token, window, "video", AUX_FIELDS, &[])
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}

fn build_record(
    metadata: &CmsVideo,
    views: f64,
    aux: &AnalyticsRow,
    window: &DateRange,
) -> AnalyticsRecord {
    let published_at = metadata.published_at.or(metadata.created_at);
    let days = window.averaging_days(published_at, Utc::now());

    AnalyticsRecord {
        id: metadata.id.clone(),
        title: metadata
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_owned()),
        tags: metadata.tags.clone(),
        views: Metric::Value(views),
        daily_avg_views: Metric::Value(daily_average(views, days)),
        impressions: Metric::Value(aux.video_impression.unwrap_or(0.0)),
        engagement_score: Metric::Value(aux.engagement_score.unwrap_or(0.0)),
        play_rate: Metric::Value(aux.play_rate.unwrap_or(0.0)),
        seconds_viewed: Metric::Value(aux.video_seconds_viewed.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn metadata() -> CmsVideo {
        CmsVideo {
            id: "6312345678112".to_owned(),
            name: Some("Launch recap".to_owned()),
            tags: vec!["launch".to_owned()],
            state: Some("ACTIVE".to_owned()),
            created_at: None,
            published_at: None,
            images: None,
        }
    }

    #[test]
    fn ten_day_range_averages_views_per_day() {
        let window = DateRange::range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .unwrap();
        let record = build_record(&metadata(), 100.0, &AnalyticsRow::default(), &window);
        assert_eq!(record.views, Metric::Value(100.0));
        assert_eq!(record.daily_avg_views, Metric::Value(10.0));
    }

    #[test]
    fn absent_aux_row_defaults_to_zero() {
        let record = build_record(
            &metadata(),
            5.0,
            &AnalyticsRow::default(),
            &DateRange::all_time(),
        );
        assert_eq!(record.impressions, Metric::Value(0.0));
        assert_eq!(record.engagement_score, Metric::Value(0.0));
        assert_eq!(record.play_rate, Metric::Value(0.0));
        assert_eq!(record.seconds_viewed, Metric::Value(0.0));
    }

    #[test]
    fn all_time_average_uses_days_since_publish() {
        let mut meta = metadata();
        meta.published_at = Some(Utc::now() - Duration::days(4) + Duration::hours(1));
        let record = build_record(&meta, 100.0, &AnalyticsRow::default(), &DateRange::all_time());
        assert_eq!(record.daily_avg_views, Metric::Value(25.0));
    }

    #[test]
    fn all_time_without_publish_date_uses_one_day() {
        let record = build_record(
            &metadata(),
            42.0,
            &AnalyticsRow::default(),
            &DateRange::all_time(),
        );
        assert_eq!(record.daily_avg_views, Metric::Value(42.0));
    }
}
