#[derive(Clone)]
pub struct AppConfig {
    pub account_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub oauth_url: String,
    pub cms_url: String,
    pub analytics_url: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub metrics_concurrency: usize,
    pub sources_concurrency: usize,
    pub time_budget_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("oauth_url", &self.oauth_url)
            .field("cms_url", &self.cms_url)
            .field("analytics_url", &self.analytics_url)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("metrics_concurrency", &self.metrics_concurrency)
            .field("sources_concurrency", &self.sources_concurrency)
            .field("time_budget_secs", &self.time_budget_secs)
            .finish()
    }
}
