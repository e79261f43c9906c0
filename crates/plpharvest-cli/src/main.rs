mod driver;
mod sink;

use std::path::PathBuf;

use clap::Parser;
use plpharvest_core::HarvestConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "plpharvest")]
#[command(about = "Harvest product listings into a JSON-lines file")]
struct Cli {
    /// Search keyword (ignored when --start-url is given)
    #[arg(long)]
    keyword: Option<String>,

    /// Listing URL to start from instead of the keyword search
    #[arg(long)]
    start_url: Option<String>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Site sort token, e.g. `pricedesc`
    #[arg(long)]
    sort_by: Option<String>,

    /// Stop after this many records are saved
    #[arg(long)]
    results_wanted: Option<usize>,

    /// Visit each product's detail page before saving it
    #[arg(long)]
    detail: bool,

    #[arg(long)]
    max_pages: Option<u32>,

    /// Parallel page fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Proxy for page fetches (overrides `HARVEST_PROXY_URL`)
    #[arg(long)]
    proxy: Option<String>,

    /// Output file (JSON lines)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the environment config.
    fn apply(self, config: &mut HarvestConfig) -> anyhow::Result<()> {
        if let Some(keyword) = self.keyword {
            config.keyword = keyword;
        }
        if let Some(url) = self.start_url {
            config.start_url = Some(url);
        }
        if let Some(min) = self.min_price {
            config.min_price = Some(min);
        }
        if let Some(max) = self.max_price {
            config.max_price = Some(max);
        }
        if let Some(sort) = self.sort_by {
            config.sort_by = sort;
        }
        if let Some(wanted) = self.results_wanted {
            config.results_wanted = wanted;
        }
        if self.detail {
            config.detail_mode = true;
        }
        if let Some(pages) = self.max_pages {
            config.max_pages = pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency.max(1);
        }
        if let Some(proxy) = self.proxy.filter(|p| !p.trim().is_empty()) {
            config.proxy_url = Some(proxy);
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }

        if config.results_wanted == 0 {
            anyhow::bail!("--results-wanted must be a positive integer");
        }
        for price in [config.min_price, config.max_price].into_iter().flatten() {
            if !price.is_finite() || price < 0.0 {
                anyhow::bail!("price bounds must be non-negative, got {price}");
            }
        }
        if let (Some(min), Some(max)) = (config.min_price, config.max_price) {
            if min > max {
                anyhow::bail!("--min-price {min} is greater than --max-price {max}");
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = plpharvest_core::load_harvest_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli.apply(&mut config)?;
    tracing::debug!(?config, "configuration loaded");

    let summary = driver::run_harvest(&config).await?;
    tracing::info!(
        saved = summary.saved,
        target = config.results_wanted,
        pages = summary.pages_handled,
        empty_pages = summary.empty_pages,
        duplicates = summary.duplicates_dropped,
        filtered = summary.filtered_out,
        output = %config.output_path.display(),
        "harvest complete"
    );
    Ok(())
}
