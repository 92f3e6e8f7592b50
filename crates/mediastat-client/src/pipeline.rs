//! End-to-end batch: query text in, [`BatchReport`] out.
//!
//! Only an authentication failure aborts a batch, whether it happens before
//! resolution or on a token refresh mid-batch. Everything else degrades per
//! item: a failed search yields an empty report,
//! failed or late metrics become unavailable records, and failed source
//! breakdowns become empty lists. Each degradation leaves a note.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mediastat_core::{
    parse_query, AnalyticsRecord, AppConfig, CatalogItem, DateRange, SearchQuery, ViewSource,
};
use serde::Serialize;
use tokio::time::Instant;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::pool::{run_bounded, PoolOptions, PoolOutcome};
use crate::token::TokenProvider;

pub const NO_RESULTS_NOTE: &str = "no results";

/// Tunables for one [`run_batch`] call.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub window: DateRange,
    pub metrics_concurrency: usize,
    pub sources_concurrency: usize,
    /// Wall-clock budget for the metrics phase, measured from its start.
    pub time_budget: Duration,
    pub retry_delay: Duration,
}

impl BatchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig, window: DateRange) -> Self {
        Self {
            window,
            metrics_concurrency: config.metrics_concurrency,
            sources_concurrency: config.sources_concurrency,
            time_budget: Duration::from_secs(config.time_budget_secs),
            retry_delay: Duration::from_millis(config.retry_backoff_base_ms),
        }
    }
}

/// Everything the reporting side needs for one export.
///
/// `items` and `records` share indexing: `records[i]` describes `items[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub query: String,
    pub parsed: SearchQuery,
    pub window: DateRange,
    pub items: Vec<CatalogItem>,
    pub records: Vec<AnalyticsRecord>,
    pub view_sources: BTreeMap<String, Vec<ViewSource>>,
    pub notes: Vec<String>,
    pub time_budget_reached: bool,
}

impl BatchReport {
    fn empty(query: &str, parsed: SearchQuery, window: DateRange, note: String) -> Self {
        Self {
            query: query.to_owned(),
            parsed,
            window,
            items: Vec::new(),
            records: Vec::new(),
            view_sources: BTreeMap::new(),
            notes: vec![note],
            time_budget_reached: false,
        }
    }

    /// Number of records filled with the unavailable marker.
    #[must_use]
    pub fn unavailable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_unavailable()).count()
    }
}

/// Runs a full export for `raw_query`.
///
/// The metrics and source phases run side by side. Only the metrics phase is
/// bounded by `options.time_budget`; source breakdowns are awaited in full.
///
/// # Errors
///
/// Returns [`ApiError::AuthConfig`] or [`ApiError::AuthExchange`] when a
/// token cannot be obtained, either before resolution or when a unit of work
/// refreshes it. No other failure is fatal.
pub async fn run_batch(
    client: &ApiClient,
    tokens: Arc<TokenProvider>,
    raw_query: &str,
    options: &BatchOptions,
) -> Result<BatchReport, ApiError> {
    let parsed = parse_query(raw_query);
    let window = options.window;
    let token = tokens.get_token().await?;

    let items = match client.resolve(&parsed, &token).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "catalog resolution failed; reporting no items");
            return Ok(BatchReport::empty(
                raw_query,
                parsed,
                window,
                format!("{NO_RESULTS_NOTE}: catalog search failed ({e})"),
            ));
        }
    };
    if items.is_empty() {
        tracing::info!(query = raw_query, "query resolved to no items");
        return Ok(BatchReport::empty(
            raw_query,
            parsed,
            window,
            NO_RESULTS_NOTE.to_owned(),
        ));
    }

    let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
    let client = Arc::new(client.clone());
    let deadline = Instant::now() + options.time_budget;
    let auth_failure: Arc<Mutex<Option<ApiError>>> = Arc::default();

    let metrics_work = {
        let client = Arc::clone(&client);
        let tokens = Arc::clone(&tokens);
        let auth_failure = Arc::clone(&auth_failure);
        move |id: String| {
            let client = Arc::clone(&client);
            let tokens = Arc::clone(&tokens);
            let auth_failure = Arc::clone(&auth_failure);
            async move {
                let token = tokens
                    .get_token()
                    .await
                    .map_err(|e| record_auth_failure(&auth_failure, e))?;
                let record = client.fetch_metrics(&id, &token, &window).await?;
                Ok::<_, ApiError>(record)
            }
        }
    };
    let sources_work = {
        let auth_failure = Arc::clone(&auth_failure);
        move |id: String| {
            let client = Arc::clone(&client);
            let tokens = Arc::clone(&tokens);
            let auth_failure = Arc::clone(&auth_failure);
            async move {
                let token = tokens
                    .get_token()
                    .await
                    .map_err(|e| record_auth_failure(&auth_failure, e))?;
                let sources = client.fetch_view_sources(&id, &token, &window).await?;
                Ok::<_, ApiError>(sources)
            }
        }
    };

    let (metrics, sources) = tokio::join!(
        run_bounded(
            ids.clone(),
            PoolOptions::new(options.metrics_concurrency)
                .with_deadline(deadline)
                .with_retry_delay(options.retry_delay),
            metrics_work,
        ),
        run_bounded(
            ids,
            PoolOptions::new(options.sources_concurrency).with_retry_delay(options.retry_delay),
            sources_work,
        ),
    );

    let failure = auth_failure.lock().map(|mut slot| slot.take()).unwrap_or(None);
    if let Some(err) = failure {
        tracing::error!(error = %err, "token refresh failed mid-batch; aborting");
        return Err(err);
    }

    let report = assemble(raw_query, parsed, window, items, metrics, sources);
    tracing::info!(
        items = report.items.len(),
        unavailable = report.unavailable_count(),
        time_budget_reached = report.time_budget_reached,
        "batch complete"
    );
    Ok(report)
}

/// Keeps the first credential failure for [`run_batch`] to surface and hands
/// the pool an equivalent error to log.
fn record_auth_failure(slot: &Mutex<Option<ApiError>>, err: ApiError) -> ApiError {
    let echo = match &err {
        ApiError::AuthConfig(var) => ApiError::AuthConfig(var.clone()),
        ApiError::AuthExchange(reason) => ApiError::AuthExchange(reason.clone()),
        other => ApiError::AuthExchange(other.to_string()),
    };
    if let Ok(mut first) = slot.lock() {
        if first.is_none() {
            *first = Some(err);
        }
    }
    echo
}

/// Merges both pool outcomes into a report, filling empty metric slots with
/// unavailable records and empty source slots with empty lists.
fn assemble(
    raw_query: &str,
    parsed: SearchQuery,
    window: DateRange,
    items: Vec<CatalogItem>,
    metrics: PoolOutcome<AnalyticsRecord>,
    sources: PoolOutcome<Vec<ViewSource>>,
) -> BatchReport {
    let mut notes = Vec::new();

    let missing_metrics = metrics.missing();
    if metrics.deadline_reached {
        notes.push(format!(
            "time budget reached: {missing_metrics} of {} item(s) reported as unavailable",
            items.len()
        ));
    } else if missing_metrics > 0 {
        notes.push(format!("metrics unavailable for {missing_metrics} item(s) after retry"));
    }

    let missing_sources = sources.missing();
    if missing_sources > 0 {
        tracing::warn!(missing = missing_sources, "view sources unavailable for some items");
        notes.push(format!("view sources unavailable for {missing_sources} item(s)"));
    }

    let records = items
        .iter()
        .zip(metrics.slots)
        .map(|(item, slot)| slot.unwrap_or_else(|| AnalyticsRecord::unavailable(item)))
        .collect();

    let view_sources = items
        .iter()
        .zip(sources.slots)
        .map(|(item, slot)| (item.id.clone(), slot.unwrap_or_default()))
        .collect();

    BatchReport {
        query: raw_query.to_owned(),
        parsed,
        window,
        items,
        records,
        view_sources,
        notes,
        time_budget_reached: metrics.deadline_reached,
    }
}
