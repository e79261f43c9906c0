//! Runs a harvest end to end: an in-memory frontier, an HTTP page fetcher,
//! and a wave loop that hands fetched pages to the orchestrator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use plpharvest_core::HarvestConfig;
use plpharvest_scraper::{
    CrawlOrchestrator, CrawlRequest, ExtractionPipeline, ListingApi, ListingApiClient,
    PageOutcome, RecordSink, RequestQueue, RunOptions, RunSummary, ScraperError,
};
use reqwest::Client;

use crate::sink::JsonLinesSink;

/// FIFO crawl frontier shared between the orchestrator and the wave loop.
#[derive(Default)]
pub(crate) struct Frontier {
    pending: Mutex<VecDeque<CrawlRequest>>,
}

impl Frontier {
    /// Takes up to `max` requests from the front.
    pub(crate) fn take(&self, max: usize) -> Vec<CrawlRequest> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let n = max.min(pending.len());
        pending.drain(..n).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RequestQueue for Frontier {
    fn enqueue(&self, request: CrawlRequest) -> Result<(), ScraperError> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(request);
        Ok(())
    }
}

/// Fetches listing and detail pages as text.
pub(crate) struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the proxy URL is invalid or the
    /// client cannot be built.
    pub(crate) fn new(
        timeout_secs: u64,
        user_agent: &str,
        proxy_url: Option<&str>,
    ) -> Result<Self, ScraperError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent);
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub(crate) fn from_config(config: &HarvestConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.proxy_url.as_deref(),
        )
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::RateLimited {
                url: url.to_owned(),
                retry_after_secs: 0,
            });
        }
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Runs one harvest from the configured entry point to completion.
///
/// # Errors
///
/// Returns an error if the output file, HTTP clients or entry URL cannot be
/// set up, or if the sink fails mid-run.
pub(crate) async fn run_harvest(config: &HarvestConfig) -> anyhow::Result<RunSummary> {
    let frontier = Arc::new(Frontier::default());
    let sink = JsonLinesSink::create(&config.output_path)?;
    let api = ListingApiClient::from_config(config)?;
    let pipeline = ExtractionPipeline::from_config(api, config);
    let orchestrator = CrawlOrchestrator::new(
        pipeline,
        RunOptions::from_config(config),
        Arc::clone(&frontier),
        sink,
    );
    let fetcher = PageFetcher::from_config(config)?;

    let entry = CrawlRequest::entry(config)?;
    tracing::info!(url = %entry.url, target = config.results_wanted, "harvest starting");
    frontier.enqueue(entry)?;

    crawl(&orchestrator, &frontier, &fetcher, config.max_concurrency).await?;
    Ok(orchestrator.flush()?)
}

/// Drains the frontier in waves of up to `concurrency` parallel fetches until
/// it is empty or the orchestrator stops.
///
/// A failed fetch is logged and its request released; only sink and queue
/// errors end the crawl.
pub(crate) async fn crawl<A, S>(
    orchestrator: &CrawlOrchestrator<A, Arc<Frontier>, S>,
    frontier: &Frontier,
    fetcher: &PageFetcher,
    concurrency: usize,
) -> Result<(), ScraperError>
where
    A: ListingApi,
    S: RecordSink,
{
    let concurrency = concurrency.max(1);
    loop {
        if orchestrator.is_stopped() {
            let dropped = frontier.len();
            if dropped > 0 {
                tracing::debug!(dropped, "target reached, abandoning queued requests");
            }
            return Ok(());
        }
        let wave = frontier.take(concurrency);
        if wave.is_empty() {
            return Ok(());
        }

        let results: Vec<Result<(), ScraperError>> = stream::iter(wave)
            .map(|request| async move {
                match fetcher.fetch(&request.url).await {
                    Ok(body) => {
                        let outcome = orchestrator
                            .handle_page(&request.url, &body, &request.metadata)
                            .await?;
                        if let PageOutcome::Paginated { next_url } = &outcome {
                            tracing::debug!(url = %request.url, next_url, "next page queued");
                        }
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!(url = %request.url, error = %e, "page fetch failed");
                        orchestrator.release_request(&request.metadata)
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for result in results {
            result?;
        }
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
