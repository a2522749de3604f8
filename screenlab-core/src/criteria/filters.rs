//! Universe pre-filters applied to each symbol's latest bar before any
//! indicator work.

use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

/// Inclusive close-price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Whether `price` lies within the bounds.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Universe pre-filters, checked against the latest bar before any indicator work.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

impl Filters {
    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        self.min_volume.is_none() && self.price_range.is_none()
    }

    /// Whether a symbol whose most recent bar is `latest` stays in the universe.
    pub fn admits(&self, latest: &PriceBar) -> bool {
        if let Some(min) = self.min_volume {
            if latest.volume < min {
                return false;
            }
        }
        if let Some(range) = self.price_range {
            if !range.contains(latest.close) {
                return false;
            }
        }
        true
    }
}
