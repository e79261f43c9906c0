use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which waterfall strategy produced a listing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Catalog script block or inline global assignment in the page markup.
    PrimaryPayload,
    /// The site's internal listing/search API.
    Api,
    /// Framework hydration container (`__NEXT_DATA__`).
    SecondaryPayload,
    /// Product tiles recovered from the markup itself.
    DomHeuristic,
}

impl ExtractionMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::PrimaryPayload => "primary-payload",
            ExtractionMethod::Api => "api",
            ExtractionMethod::SecondaryPayload => "secondary-payload",
            ExtractionMethod::DomHeuristic => "dom-heuristic",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a fetched page is a multi-product listing or a single product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Listing,
    Detail,
}

/// Pagination state of a listing page.
///
/// `page` is 1-indexed. Every other field is `None` when the source did not
/// say; callers must treat that as "unknown", not as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: Option<u32>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

impl PaginationInfo {
    /// Pagination known only by its page number, e.g. parsed from a URL.
    #[must_use]
    pub fn from_page(page: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: None,
            total_pages: None,
            total_results: None,
        }
    }

    /// Returns `true` when the metadata states there is nothing after `page`.
    ///
    /// Unknown totals never count as the last page.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        self.total_pages.is_some_and(|total| self.page >= total)
    }
}

/// A product in the fixed output schema, independent of which extraction
/// strategy found it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    /// Site product id. Never empty for a record that reaches the sink.
    pub id: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    /// ISO 4217 code, e.g. `"GBP"`.
    pub currency: Option<String>,
    pub price_value: Option<f64>,
    /// Display price exactly as the site rendered it, e.g. `"£45.00"`.
    pub price_text: Option<String>,
    pub original_price_value: Option<f64>,
    pub is_marked_down: bool,
    pub is_in_stock: bool,
    /// Absolute product page URL.
    pub url: String,
    /// Absolute image URL with the query string removed.
    pub image_url: Option<String>,
    pub color: Option<String>,
    pub badge: Option<String>,
    /// Long-form description; only populated by a detail-page hop.
    pub description: Option<String>,
    /// Listing page the record was harvested from.
    pub source_url: String,
    pub extraction_method: ExtractionMethod,
    pub scraped_at: DateTime<Utc>,
}

impl CanonicalProduct {
    /// Returns `true` if the record carries an id usable for deduplication.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty()
    }
}
