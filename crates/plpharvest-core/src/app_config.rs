use std::path::PathBuf;

/// Settings for a single harvest run.
#[derive(Clone)]
pub struct HarvestConfig {
    /// Search keyword used when no explicit start URL is given.
    pub keyword: String,
    /// Overrides the keyword-derived search URL when set.
    pub start_url: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Site sort token, e.g. `"pricedesc"`.
    pub sort_by: String,
    /// Number of canonical records after which the run stops.
    pub results_wanted: usize,
    /// Listing-then-detail two-hop crawling.
    pub detail_mode: bool,
    /// Records buffered before the sink is called.
    pub batch_size: usize,
    /// Hard cap on listing pages enqueued in one run.
    pub max_pages: u32,
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub api_timeout_secs: u64,
    pub api_max_retries: u32,
    pub api_retry_backoff_base_secs: u64,
    pub api_base_url: String,
    pub site_base_url: String,
    pub media_base_url: String,
    pub user_agent: String,
    /// Opaque to the harvester; handed through to the page fetcher.
    pub proxy_url: Option<String>,
    pub output_path: PathBuf,
    pub log_level: String,
}

impl std::fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("keyword", &self.keyword)
            .field("start_url", &self.start_url)
            .field("min_price", &self.min_price)
            .field("max_price", &self.max_price)
            .field("sort_by", &self.sort_by)
            .field("results_wanted", &self.results_wanted)
            .field("detail_mode", &self.detail_mode)
            .field("batch_size", &self.batch_size)
            .field("max_pages", &self.max_pages)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_max_retries", &self.api_max_retries)
            .field(
                "api_retry_backoff_base_secs",
                &self.api_retry_backoff_base_secs,
            )
            .field("api_base_url", &self.api_base_url)
            .field("site_base_url", &self.site_base_url)
            .field("media_base_url", &self.media_base_url)
            .field("user_agent", &self.user_agent)
            .field("proxy_url", &self.proxy_url.as_ref().map(|_| "[redacted]"))
            .field("output_path", &self.output_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}
