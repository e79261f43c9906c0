pub mod api;
pub mod catalog;
pub mod dedup;
pub mod detail;
pub mod dom;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod orchestrator;
pub mod pagination;
mod parse_helpers;
pub mod payload;
pub mod pipeline;
pub mod rate_limit;
pub mod types;
pub mod urls;

pub use api::{ApiListing, ApiQuery, DisabledApi, ListingApi, ListingApiClient};
pub use dedup::Deduplicator;
pub use error::ScraperError;
pub use filter::{passes_price_filter, PriceBounds};
pub use normalize::{normalize_product, SiteUrls};
pub use orchestrator::{
    CrawlOrchestrator, CrawlRequest, PageOutcome, RecordSink, RequestMetadata, RequestQueue,
    RunOptions, RunSummary,
};
pub use pagination::next_listing_url;
pub use pipeline::ExtractionPipeline;
pub use types::{ExtractionResult, Miss, RawProduct};
