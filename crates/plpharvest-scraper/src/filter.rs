//! Price-range filtering over canonical records.

use plpharvest_core::{CanonicalProduct, HarvestConfig};

/// Optional inclusive price bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceBounds {
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            min: config.min_price,
            max: config.max_price,
        }
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Returns `false` only when a bound is set, the price is known, and the
/// price falls outside that bound. Missing data never rejects.
#[must_use]
pub fn passes_price_filter(product: &CanonicalProduct, bounds: &PriceBounds) -> bool {
    let Some(price) = product.price_value else {
        return true;
    };
    if bounds.min.is_some_and(|min| price < min) {
        return false;
    }
    !bounds.max.is_some_and(|max| price > max)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use plpharvest_core::ExtractionMethod;

    use super::*;

    fn priced(price_value: Option<f64>) -> CanonicalProduct {
        CanonicalProduct {
            id: "1".to_owned(),
            title: None,
            brand: None,
            currency: None,
            price_value,
            price_text: None,
            original_price_value: None,
            is_marked_down: false,
            is_in_stock: true,
            url: "https://www.example.com/prd/1".to_owned(),
            image_url: None,
            color: None,
            badge: None,
            description: None,
            source_url: "https://www.example.com/search/?q=men".to_owned(),
            extraction_method: ExtractionMethod::Api,
            scraped_at: Utc::now(),
        }
    }

    const BOUNDED: PriceBounds = PriceBounds {
        min: Some(20.0),
        max: Some(50.0),
    };

    #[test]
    fn unknown_price_always_passes() {
        assert!(passes_price_filter(&priced(None), &BOUNDED));
    }

    #[test]
    fn price_outside_bounds_fails() {
        assert!(!passes_price_filter(&priced(Some(19.99)), &BOUNDED));
        assert!(!passes_price_filter(&priced(Some(50.01)), &BOUNDED));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(passes_price_filter(&priced(Some(20.0)), &BOUNDED));
        assert!(passes_price_filter(&priced(Some(50.0)), &BOUNDED));
    }

    #[test]
    fn unset_bound_is_permissive() {
        let min_only = PriceBounds {
            min: Some(10.0),
            max: None,
        };
        assert!(passes_price_filter(&priced(Some(9_999.0)), &min_only));
        assert!(!passes_price_filter(&priced(Some(5.0)), &min_only));
        assert!(passes_price_filter(&priced(Some(0.0)), &PriceBounds::default()));
        assert!(PriceBounds::default().is_unbounded());
    }
}
