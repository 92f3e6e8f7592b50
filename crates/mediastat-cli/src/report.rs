//! `report` command: runs one batch and hands the JSON report to stdout or a
//! file.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use mediastat_client::{build_http_client, run_batch, ApiClient, BatchOptions, TokenProvider};
use mediastat_core::{AppConfig, DateRange};

/// Arguments for `report`.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Search expression: ids, `id:`, `tag:`, or `title:` terms separated by commas
    pub query: String,
    /// First day of the reporting window (YYYY-MM-DD); all-time when omitted
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,
    /// Last day of the reporting window, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
    /// Concurrent metric fetches (overrides MEDIASTAT_METRICS_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<NonZeroUsize>,
    /// Time budget for the metrics phase in seconds (overrides MEDIASTAT_TIME_BUDGET_SECS)
    #[arg(long)]
    pub budget_secs: Option<u64>,
    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    /// The reporting window selected by `--from`/`--to`.
    pub(crate) fn window(&self) -> anyhow::Result<DateRange> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(DateRange::range(from, to)?),
            _ => Ok(DateRange::all_time()),
        }
    }

    pub(crate) fn batch_options(&self, config: &AppConfig) -> anyhow::Result<BatchOptions> {
        let mut options = BatchOptions::from_config(config, self.window()?);
        if let Some(concurrency) = self.concurrency {
            options.metrics_concurrency = concurrency.get();
        }
        if let Some(secs) = self.budget_secs {
            options.time_budget = Duration::from_secs(secs);
        }
        Ok(options)
    }
}

pub(crate) async fn run_report(config: &AppConfig, args: &ReportArgs) -> anyhow::Result<()> {
    let options = args.batch_options(config)?;

    let http = build_http_client(config.request_timeout_secs, &config.user_agent)
        .context("failed to build HTTP client")?;
    let client =
        ApiClient::from_config(http.clone(), config).context("failed to build API client")?;
    let tokens = Arc::new(
        TokenProvider::from_config(http, config).context("failed to build token provider")?,
    );

    tracing::info!(
        query = %args.query,
        window = %options.window,
        concurrency = options.metrics_concurrency,
        budget_secs = options.time_budget.as_secs(),
        "starting report"
    );
    let report = run_batch(&client, tokens, &args.query, &options)
        .await
        .context("report aborted")?;

    for note in &report.notes {
        tracing::warn!(note = %note, "report note");
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                items = report.items.len(),
                "report written"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
