//! What the orchestrator needs from the outside world: somewhere to put
//! new requests and somewhere to put finished records.

use std::sync::Arc;

use plpharvest_core::{CanonicalProduct, PageKind};

use crate::error::ScraperError;

/// Metadata carried with every request through the external queue.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    pub kind: PageKind,
    /// Listing page number (1-based); `0` for detail pages.
    pub page: u32,
    /// The listing record a detail request will complete.
    pub listing_product: Option<CanonicalProduct>,
}

impl RequestMetadata {
    #[must_use]
    pub fn listing(page: u32) -> Self {
        Self {
            kind: PageKind::Listing,
            page: page.max(1),
            listing_product: None,
        }
    }

    #[must_use]
    pub fn detail(listing_product: CanonicalProduct) -> Self {
        Self {
            kind: PageKind::Detail,
            page: 0,
            listing_product: Some(listing_product),
        }
    }
}

/// A URL to fetch plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub url: String,
    pub metadata: RequestMetadata,
}

/// The external crawl frontier.
pub trait RequestQueue: Send + Sync {
    /// Schedules `request` for fetching.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Enqueue`] if the request cannot be accepted.
    fn enqueue(&self, request: CrawlRequest) -> Result<(), ScraperError>;
}

/// The external output store.
pub trait RecordSink: Send + Sync {
    /// Persists one batch of records, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Persist`] if the batch cannot be written.
    fn persist_batch(&self, records: &[CanonicalProduct]) -> Result<(), ScraperError>;
}

impl<T: RequestQueue + ?Sized> RequestQueue for Arc<T> {
    fn enqueue(&self, request: CrawlRequest) -> Result<(), ScraperError> {
        (**self).enqueue(request)
    }
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn persist_batch(&self, records: &[CanonicalProduct]) -> Result<(), ScraperError> {
        (**self).persist_batch(records)
    }
}
