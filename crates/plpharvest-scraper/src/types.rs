//! Shapes shared by every extraction strategy.
//!
//! Each strategy sees the site's catalog through a different lens (a page
//! payload, an API response, or product tiles in markup) and the product
//! objects come back with different keys. Nothing is forced into a schema at
//! this stage: a [`RawProduct`] is the untyped key-value bag plus the tag of
//! the strategy that produced it, and [`crate::normalize`] owns the single
//! per-field resolution table.

use plpharvest_core::{ExtractionMethod, PaginationInfo};
use serde_json::{Map, Value};

/// One product object as a strategy found it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProduct {
    pub method: ExtractionMethod,
    pub fields: Map<String, Value>,
}

impl RawProduct {
    #[must_use]
    pub fn new(method: ExtractionMethod, fields: Map<String, Value>) -> Self {
        Self { method, fields }
    }

    /// Wraps a JSON value, returning `None` for anything but an object.
    #[must_use]
    pub fn from_value(method: ExtractionMethod, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { method, fields }),
            _ => None,
        }
    }

    /// Looks up a nested key path, e.g. `["price", "current", "value"]`.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut node = self.fields.get(*first)?;
        for key in rest {
            node = node.get(*key)?;
        }
        Some(node)
    }
}

/// The products one strategy recovered from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub method: ExtractionMethod,
    pub products: Vec<RawProduct>,
    pub pagination: Option<PaginationInfo>,
}

/// Why a strategy produced nothing. Always recoverable: the waterfall moves
/// on to the next strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// No payload block or assignment was found, or none parsed.
    NoPayload,
    /// A payload parsed but no known path held a non-empty products array.
    NoProducts,
    /// The API failed, timed out, or returned an empty listing.
    ApiEmpty,
    /// No tile in the markup had a product link.
    NoTiles,
}

impl std::fmt::Display for Miss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Miss::NoPayload => "no payload",
            Miss::NoProducts => "no products at known paths",
            Miss::ApiEmpty => "api returned nothing",
            Miss::NoTiles => "no product tiles",
        };
        f.write_str(text)
    }
}
