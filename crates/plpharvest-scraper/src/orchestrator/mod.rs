//! Per-page glue: extraction, normalization, filtering, deduplication,
//! saving, and deciding what to fetch next.
//!
//! `handle_page` may be called concurrently for different pages. All run
//! state lives behind one mutex that is never held across an `.await` or a
//! collaborator call; extraction and normalization run outside it.
//!
//! Full batches are drained and handed to the sink under a second lock, the
//! outbox, so batches reach the sink in the order their records were saved.
//! A batch the sink rejects goes back to the front of the buffer.

mod collaborators;
mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

use plpharvest_core::{CanonicalProduct, HarvestConfig, PageKind};

use crate::api::ListingApi;
use crate::detail::{extract_detail_product, merge_detail};
use crate::error::ScraperError;
use crate::filter::{passes_price_filter, PriceBounds};
use crate::normalize::{normalize_product, SiteUrls};
use crate::pagination::{next_listing_url, page_from_url, resolve_pagination};
use crate::pipeline::ExtractionPipeline;
use crate::urls::entry_url;

pub use collaborators::{CrawlRequest, RecordSink, RequestMetadata, RequestQueue};
pub use state::RunSummary;

use state::{CrawlState, Rejection};

/// Run-level settings the orchestrator needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub bounds: PriceBounds,
    pub results_wanted: usize,
    pub batch_size: usize,
    pub detail_mode: bool,
    pub max_pages: u32,
    pub urls: SiteUrls,
}

impl RunOptions {
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            bounds: PriceBounds::from_config(config),
            results_wanted: config.results_wanted.max(1),
            batch_size: config.batch_size.max(1),
            detail_mode: config.detail_mode,
            max_pages: config.max_pages.max(1),
            urls: SiteUrls::from_config(config),
        }
    }
}

/// What handling one page led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The target is met (or fully reserved); nothing further was enqueued.
    Stopped,
    /// The next listing page was enqueued.
    Paginated { next_url: String },
    /// The listing has no further pages, or the page cap was reached.
    Exhausted,
    /// Every strategy missed; the page contributed nothing.
    Empty,
    /// A detail page completed its listing record.
    DetailSaved,
}

impl CrawlRequest {
    /// The first request of a run: the configured start URL or the keyword
    /// search URL, as a listing page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the entry URL does not parse.
    pub fn entry(config: &HarvestConfig) -> Result<Self, ScraperError> {
        let url = entry_url(config)?;
        let page = page_from_url(&url);
        Ok(Self {
            url,
            metadata: RequestMetadata::listing(page),
        })
    }
}

/// Drives a harvest run page by page.
pub struct CrawlOrchestrator<A, Q, S> {
    pipeline: ExtractionPipeline<A>,
    options: RunOptions,
    queue: Q,
    sink: S,
    state: Mutex<CrawlState>,
    outbox: Mutex<()>,
}

impl<A, Q, S> CrawlOrchestrator<A, Q, S>
where
    A: ListingApi,
    Q: RequestQueue,
    S: RecordSink,
{
    #[must_use]
    pub fn new(pipeline: ExtractionPipeline<A>, options: RunOptions, queue: Q, sink: S) -> Self {
        let state = Mutex::new(CrawlState::new(options.results_wanted));
        Self {
            pipeline,
            options,
            queue,
            sink,
            state,
            outbox: Mutex::new(()),
        }
    }

    /// `true` once the saved count reached the target. Callers should stop
    /// fetching; pages already in flight are discarded.
    pub fn is_stopped(&self) -> bool {
        self.lock().is_stopped()
    }

    /// Handles one fetched page.
    ///
    /// A page that yields nothing is not an error. Only collaborator
    /// failures propagate.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Enqueue`] or [`ScraperError::Persist`] from
    /// the queue or sink.
    pub async fn handle_page(
        &self,
        url: &str,
        body: &str,
        metadata: &RequestMetadata,
    ) -> Result<PageOutcome, ScraperError> {
        match metadata.kind {
            PageKind::Listing => self.handle_listing(url, body).await,
            PageKind::Detail => self.handle_detail(url, body, metadata),
        }
    }

    /// Gives back a request the driver could not complete.
    ///
    /// An abandoned detail hop saves the listing record it carried, so a
    /// failed fetch never leaves a reserved slot unfilled.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Persist`] from the sink.
    pub fn release_request(&self, metadata: &RequestMetadata) -> Result<(), ScraperError> {
        match (&metadata.kind, &metadata.listing_product) {
            (PageKind::Detail, Some(listing)) => {
                tracing::warn!(
                    id = %listing.id,
                    url = %listing.url,
                    "detail page abandoned, keeping listing record"
                );
                self.commit_detail(listing.clone()).map(|_| ())
            }
            _ => {
                tracing::debug!(page = metadata.page, "listing request released");
                Ok(())
            }
        }
    }

    /// Persists everything still buffered and returns the run counters.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Persist`] from the sink.
    pub fn flush(&self) -> Result<RunSummary, ScraperError> {
        let _outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        let (remaining, summary, reserved) = self.lock().finish();
        if reserved > 0 {
            tracing::warn!(reserved, "run flushed with detail pages still outstanding");
        }
        if !remaining.is_empty() {
            self.persist(vec![remaining])?;
        }
        tracing::info!(
            saved = summary.saved,
            pages = summary.pages_handled,
            empty_pages = summary.empty_pages,
            duplicates = summary.duplicates_dropped,
            filtered = summary.filtered_out,
            "run flushed"
        );
        Ok(summary)
    }

    async fn handle_listing(&self, url: &str, body: &str) -> Result<PageOutcome, ScraperError> {
        if self.lock().target_committed() {
            tracing::debug!(url, "target already committed, discarding page");
            return Ok(PageOutcome::Stopped);
        }

        let Some(result) = self.pipeline.run(url, body).await else {
            self.lock().record_page(true);
            tracing::warn!(url, "no products extracted from page");
            return Ok(PageOutcome::Empty);
        };

        let on_page = result.products.len();
        let pagination = resolve_pagination(url, result.pagination);
        let method = result.method;
        let candidates: Vec<CanonicalProduct> = result
            .products
            .iter()
            .map(|raw| normalize_product(raw, url, &self.options.urls))
            .filter(|record| {
                let valid = record.has_identity();
                if !valid {
                    tracing::debug!(url, "discarding record without id");
                }
                valid
            })
            .collect();

        let mut details = Vec::new();
        let (saved, committed) = {
            let mut state = self.lock();
            state.record_page(false);
            for record in candidates {
                if !passes_price_filter(&record, &self.options.bounds) {
                    state.record_filtered();
                    continue;
                }
                let admitted = if self.options.detail_mode {
                    let reserved = state.reserve(&record.id);
                    if reserved.is_ok() {
                        details.push(record);
                    }
                    reserved
                } else {
                    state.save(record)
                };
                if admitted == Err(Rejection::TargetMet) {
                    break;
                }
            }
            (state.saved(), state.target_committed())
        };

        self.enqueue_details(details)?;
        self.persist_ready()?;

        tracing::info!(
            url,
            method = %method,
            products = on_page,
            saved,
            target = self.options.results_wanted,
            "listing page handled"
        );

        if committed {
            return Ok(PageOutcome::Stopped);
        }
        if pagination.page >= self.options.max_pages {
            tracing::info!(page = pagination.page, max_pages = self.options.max_pages, "page cap reached");
            return Ok(PageOutcome::Exhausted);
        }
        let Some(next_url) = next_listing_url(url, &pagination, on_page) else {
            return Ok(PageOutcome::Exhausted);
        };
        // Another worker may have met the target while this page was saving.
        if self.lock().target_committed() {
            return Ok(PageOutcome::Stopped);
        }
        self.queue.enqueue(CrawlRequest {
            url: next_url.clone(),
            metadata: RequestMetadata::listing(pagination.page + 1),
        })?;
        Ok(PageOutcome::Paginated { next_url })
    }

    fn handle_detail(
        &self,
        url: &str,
        body: &str,
        metadata: &RequestMetadata,
    ) -> Result<PageOutcome, ScraperError> {
        let Some(listing) = &metadata.listing_product else {
            tracing::warn!(url, "detail request without a listing record");
            self.lock().record_page(true);
            return Ok(PageOutcome::Empty);
        };

        let record = match extract_detail_product(body) {
            Some(detail) => merge_detail(listing, &detail, &self.options.urls),
            None => {
                tracing::debug!(url, "detail page had no product data, keeping listing record");
                listing.clone()
            }
        };
        self.lock().record_page(false);
        self.commit_detail(record)
    }

    fn commit_detail(&self, record: CanonicalProduct) -> Result<PageOutcome, ScraperError> {
        let (kept, stopped) = {
            let mut state = self.lock();
            let kept = state.commit_reserved(record);
            (kept, state.is_stopped())
        };
        self.persist_ready()?;
        if !kept {
            tracing::debug!("run already stopped, discarding detail record");
        }
        Ok(if stopped {
            PageOutcome::Stopped
        } else {
            PageOutcome::DetailSaved
        })
    }

    /// Enqueues one detail hop per reserved record. If the queue refuses
    /// one, that record and every one after it are saved from their listing
    /// data so their reservations are not left dangling.
    fn enqueue_details(&self, details: Vec<CanonicalProduct>) -> Result<(), ScraperError> {
        let mut details = details.into_iter();
        let mut failure = None;
        for record in details.by_ref() {
            let request = CrawlRequest {
                url: record.url.clone(),
                metadata: RequestMetadata::detail(record.clone()),
            };
            if let Err(err) = self.queue.enqueue(request) {
                failure = Some((record, err));
                break;
            }
        }
        let Some((record, err)) = failure else {
            return Ok(());
        };

        let stranded: Vec<CanonicalProduct> = std::iter::once(record).chain(details).collect();
        tracing::warn!(
            count = stranded.len(),
            error = %err,
            "detail hops could not be enqueued, keeping listing records"
        );
        {
            let mut state = self.lock();
            for record in stranded {
                state.commit_reserved(record);
            }
        }
        self.persist_ready()?;
        Err(err)
    }

    /// Hands every full batch to the sink, oldest first.
    fn persist_ready(&self) -> Result<(), ScraperError> {
        let _outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        let batches = self.lock().drain_full_batches(self.options.batch_size);
        self.persist(batches)
    }

    /// Caller holds the outbox lock.
    fn persist(&self, mut batches: Vec<Vec<CanonicalProduct>>) -> Result<(), ScraperError> {
        let failed = batches.iter().enumerate().find_map(|(i, batch)| {
            match self.sink.persist_batch(batch) {
                Ok(()) => {
                    tracing::debug!(count = batch.len(), "batch persisted");
                    None
                }
                Err(err) => Some((i, err)),
            }
        });
        let Some((i, err)) = failed else {
            return Ok(());
        };
        let unsent = batches.split_off(i);
        tracing::warn!(
            records = unsent.iter().map(Vec::len).sum::<usize>(),
            error = %err,
            "sink rejected a batch, records kept for the next flush"
        );
        self.lock().restore_unsent(unsent);
        Err(err)
    }

    fn lock(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
