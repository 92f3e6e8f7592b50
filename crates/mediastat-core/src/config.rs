use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Credentials are optional here: a missing account or client credential is
/// reported by the token provider the first time a token is requested, so
/// offline commands (such as parsing a query) work without them.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let account_id = optional("MEDIASTAT_ACCOUNT_ID");
    let client_id = optional("MEDIASTAT_CLIENT_ID");
    let client_secret = optional("MEDIASTAT_CLIENT_SECRET");

    let oauth_url = or_default("MEDIASTAT_OAUTH_URL", "https://oauth.brightcove.com/v4");
    let cms_url = or_default("MEDIASTAT_CMS_URL", "https://cms.api.brightcove.com/v1");
    let analytics_url = or_default(
        "MEDIASTAT_ANALYTICS_URL",
        "https://analytics.api.brightcove.com/v1",
    );
    let log_level = or_default("MEDIASTAT_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("MEDIASTAT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("MEDIASTAT_USER_AGENT", "mediastat/0.1 (analytics-export)");
    let max_retries = parse_u32("MEDIASTAT_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("MEDIASTAT_RETRY_BACKOFF_BASE_MS", "500")?;
    let metrics_concurrency = parse_positive_usize("MEDIASTAT_METRICS_CONCURRENCY", "8")?;
    let sources_concurrency = parse_positive_usize("MEDIASTAT_SOURCES_CONCURRENCY", "4")?;
    let time_budget_secs = parse_u64("MEDIASTAT_TIME_BUDGET_SECS", "45")?;

    Ok(AppConfig {
        account_id,
        client_id,
        client_secret,
        oauth_url,
        cms_url,
        analytics_url,
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        metrics_concurrency,
        sources_concurrency,
        time_budget_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
