//! Domain types shared by the resolver, the fetchers, and the report hand-off.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::CoreError;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Structured form of a free-form search expression.
///
/// When `ids` is non-empty the catalog is queried by identifier and the tag
/// and title terms are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub ids: BTreeSet<String>,
    pub tag_terms: Vec<String>,
    pub title_terms: Vec<String>,
}

impl SearchQuery {
    /// `true` when the query carries no constraint at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.tag_terms.is_empty() && self.title_terms.is_empty()
    }

    #[must_use]
    pub fn uses_id_lookup(&self) -> bool {
        !self.ids.is_empty()
    }
}

/// Reporting window: either all time or an inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl DateRange {
    #[must_use]
    pub fn all_time() -> Self {
        Self { bounds: None }
    }

    /// Builds a bounded window covering `from` through `to`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDateRange`] if `from` is after `to`.
    pub fn range(from: NaiveDate, to: NaiveDate) -> Result<Self, CoreError> {
        if from > to {
            return Err(CoreError::InvalidDateRange { from, to });
        }
        Ok(Self {
            bounds: Some((from, to)),
        })
    }

    #[must_use]
    pub fn is_all_time(&self) -> bool {
        self.bounds.is_none()
    }

    /// `(from, to)` for a bounded window, `None` for all time.
    #[must_use]
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.bounds
    }

    /// Inclusive number of days in a bounded window.
    #[must_use]
    pub fn day_count(&self) -> Option<i64> {
        self.bounds.map(|(from, to)| (to - from).num_days() + 1)
    }

    /// Number of days used to average views for an item.
    ///
    /// Bounded windows use their inclusive day count. All-time windows use
    /// the whole days elapsed since publication, rounded up, never less
    /// than one; an item without a publish timestamp counts as one day.
    #[must_use]
    pub fn averaging_days(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
        if let Some(days) = self.day_count() {
            return days;
        }
        let Some(published_at) = published_at else {
            return 1;
        };
        let elapsed = (now - published_at).num_milliseconds();
        let days =
            elapsed.div_euclid(MILLIS_PER_DAY) + i64::from(elapsed.rem_euclid(MILLIS_PER_DAY) != 0);
        days.max(1)
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.bounds {
            None => {
                let mut s = serializer.serialize_struct("DateRange", 1)?;
                s.serialize_field("mode", "alltime")?;
                s.end()
            }
            Some((from, to)) => {
                let mut s = serializer.serialize_struct("DateRange", 3)?;
                s.serialize_field("mode", "range")?;
                s.serialize_field("from", &from)?;
                s.serialize_field("to", &to)?;
                s.end()
            }
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bounds {
            None => write!(f, "all time"),
            Some((from, to)) => write!(f, "{from} to {to}"),
        }
    }
}

/// A catalog item as resolved from the CMS.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
}

/// A single metric value, or a marker that it could not be determined.
///
/// Serialises as a number or `null`, so "no data" stays distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    Unavailable,
}

impl Metric {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Unavailable => None,
        }
    }

    #[must_use]
    pub fn is_unavailable(self) -> bool {
        matches!(self, Metric::Unavailable)
    }
}

impl From<f64> for Metric {
    fn from(value: f64) -> Self {
        Metric::Value(value)
    }
}

/// Per-item analytics for one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRecord {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub views: Metric,
    pub daily_avg_views: Metric,
    pub impressions: Metric,
    pub engagement_score: Metric,
    pub play_rate: Metric,
    pub seconds_viewed: Metric,
}

impl AnalyticsRecord {
    /// Record for an item whose metrics could not be fetched in time.
    #[must_use]
    pub fn unavailable(item: &CatalogItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.name.clone(),
            tags: item.tags.clone(),
            views: Metric::Unavailable,
            daily_avg_views: Metric::Unavailable,
            impressions: Metric::Unavailable,
            engagement_score: Metric::Unavailable,
            play_rate: Metric::Unavailable,
            seconds_viewed: Metric::Unavailable,
        }
    }

    /// `true` when every metric is the unavailable marker.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        [
            self.views,
            self.daily_avg_views,
            self.impressions,
            self.engagement_score,
            self.play_rate,
            self.seconds_viewed,
        ]
        .iter()
        .all(|m| m.is_unavailable())
    }
}

/// Referring page and the views it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSource {
    pub url: String,
    pub views: u64,
}

impl ViewSource {
    /// Builds a source from a destination domain and path.
    ///
    /// Returns `None` when the domain is missing or blank. A missing path
    /// becomes `/`, and a relative path gains a leading `/`.
    #[must_use]
    pub fn from_parts(domain: Option<&str>, path: Option<&str>, views: u64) -> Option<Self> {
        let domain = domain.map(str::trim).filter(|d| !d.is_empty())?;
        let path = path.map(str::trim).unwrap_or_default();
        let url = if path.is_empty() {
            format!("https://{domain}/")
        } else if path.starts_with('/') {
            format!("https://{domain}{path}")
        } else {
            format!("https://{domain}/{path}")
        };
        Some(Self { url, views })
    }
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average views per day, rounded to two decimal places.
#[must_use]
pub fn daily_average(views: f64, days: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let days = days.max(1) as f64;
    round2(views / days)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn range_day_count_is_inclusive() {
        let range = DateRange::range(date(2024, 1, 1), date(2024, 1, 10)).unwrap();
        assert_eq!(range.day_count(), Some(10));
    }

    #[test]
    fn single_day_range_counts_one_day() {
        let range = DateRange::range(date(2024, 3, 5), date(2024, 3, 5)).unwrap();
        assert_eq!(range.day_count(), Some(1));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::range(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDateRange { .. }));
    }

    #[test]
    fn ten_day_range_averages_to_two_decimals() {
        let range = DateRange::range(date(2024, 1, 1), date(2024, 1, 10)).unwrap();
        let days = range.averaging_days(None, Utc::now());
        assert!((daily_average(100.0, days) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn all_time_rounds_partial_days_up() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let published = now - Duration::hours(49);
        assert_eq!(DateRange::all_time().averaging_days(Some(published), now), 3);
    }

    #[test]
    fn all_time_counts_sub_second_remainder_as_another_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let published = now - Duration::days(2) - Duration::milliseconds(500);
        assert_eq!(DateRange::all_time().averaging_days(Some(published), now), 3);
        let exact = now - Duration::days(2);
        assert_eq!(DateRange::all_time().averaging_days(Some(exact), now), 2);
    }

    #[test]
    fn all_time_never_less_than_one_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(DateRange::all_time().averaging_days(Some(now), now), 1);
        let future = now + Duration::days(3);
        assert_eq!(DateRange::all_time().averaging_days(Some(future), now), 1);
    }

    #[test]
    fn all_time_without_publish_date_uses_one_day() {
        assert_eq!(DateRange::all_time().averaging_days(None, Utc::now()), 1);
    }

    #[test]
    fn daily_average_rounds_half_up() {
        assert!((daily_average(10.0, 3) - 3.33).abs() < 1e-9);
        assert!((daily_average(2.0, 3) - 0.67).abs() < 1e-9);
    }

    #[test]
    fn unavailable_metric_serialises_as_null() {
        let json = serde_json::to_value(Metric::Unavailable).unwrap();
        assert!(json.is_null());
        let json = serde_json::to_value(Metric::Value(0.0)).unwrap();
        assert_eq!(json, serde_json::json!(0.0));
    }

    #[test]
    fn date_range_serialises_mode() {
        let json = serde_json::to_value(DateRange::all_time()).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "alltime" }));
        let range = DateRange::range(date(2024, 1, 1), date(2024, 1, 10)).unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "mode": "range", "from": "2024-01-01", "to": "2024-01-10" })
        );
    }

    #[test]
    fn view_source_synthesises_url() {
        let src = ViewSource::from_parts(Some("a.com"), Some("/x"), 5).unwrap();
        assert_eq!(src.url, "https://a.com/x");
        let src = ViewSource::from_parts(Some("b.com"), Some(""), 2).unwrap();
        assert_eq!(src.url, "https://b.com/");
        let src = ViewSource::from_parts(Some("c.com"), None, 1).unwrap();
        assert_eq!(src.url, "https://c.com/");
        let src = ViewSource::from_parts(Some("d.com"), Some("watch/1"), 1).unwrap();
        assert_eq!(src.url, "https://d.com/watch/1");
    }

    #[test]
    fn view_source_without_domain_is_dropped() {
        assert!(ViewSource::from_parts(None, Some("/x"), 5).is_none());
        assert!(ViewSource::from_parts(Some("  "), Some("/x"), 5).is_none());
    }

    #[test]
    fn unavailable_record_keeps_identity() {
        let item = CatalogItem {
            id: "6312345678112".to_string(),
            name: "Launch recap".to_string(),
            tags: vec!["launch".to_string()],
            thumbnail_url: "https://img.example/t.jpg".to_string(),
            created_at: Utc::now(),
        };
        let record = AnalyticsRecord::unavailable(&item);
        assert_eq!(record.id, item.id);
        assert_eq!(record.title, item.name);
        assert!(record.is_unavailable());
    }
}
