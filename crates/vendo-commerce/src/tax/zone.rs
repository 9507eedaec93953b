//! Tax zone, rate, and category types.

use crate::address::Address;
use crate::ids::{TaxCategoryId, TaxRateId, TaxZoneId};
use serde::{Deserialize, Serialize};

/// A geographic tax jurisdiction.
///
/// A zone matches on country, and optionally narrows to a region. A
/// region-level zone never matches addresses outside that region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxZone {
    /// Unique zone identifier.
    pub id: TaxZoneId,
    /// Display name.
    pub name: String,
    /// Country code (e.g., "GB").
    pub country: String,
    /// Region code (e.g., "gb-sct"). `None` matches the whole country.
    pub region: Option<String>,
}

impl TaxZone {
    /// Create a country-level zone.
    pub fn new(id: impl Into<TaxZoneId>, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            country: country.into(),
            region: None,
        }
    }

    /// Narrow the zone to a region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Whether this zone covers the given address.
    pub fn matches(&self, address: &Address) -> bool {
        if !self.country.eq_ignore_ascii_case(&address.country_code) {
            return false;
        }
        match &self.region {
            None => true,
            Some(region) => address
                .region_code
                .as_deref()
                .map(|r| region.eq_ignore_ascii_case(r))
                .unwrap_or(false),
        }
    }

    /// Whether this is a region-level (more specific) zone.
    pub fn is_region_level(&self) -> bool {
        self.region.is_some()
    }
}

/// A product tax classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxCategory {
    /// Unique category identifier.
    pub id: TaxCategoryId,
    /// Display name.
    pub name: String,
}

impl TaxCategory {
    pub fn new(id: impl Into<TaxCategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A tax rate, belonging to exactly one zone and one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxRate {
    /// Unique rate identifier.
    pub id: TaxRateId,
    /// Display name.
    pub name: String,
    /// Integer percentage rate.
    pub rate: i64,
    /// Zone this rate belongs to.
    pub zone: TaxZoneId,
    /// Category this rate belongs to.
    pub category: TaxCategoryId,
    /// Whether the rate is already included in product prices.
    pub inclusive: bool,
}

impl TaxRate {
    pub fn new(
        id: impl Into<TaxRateId>,
        name: impl Into<String>,
        rate: i64,
        zone: impl Into<TaxZoneId>,
        category: impl Into<TaxCategoryId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rate,
            zone: zone.into(),
            category: category.into(),
            inclusive: false,
        }
    }

    /// Mark the rate as included in prices.
    pub fn include_in_price(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }
}
