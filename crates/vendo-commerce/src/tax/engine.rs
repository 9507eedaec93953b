//! Tax rate resolution.

use crate::address::Address;
use crate::ids::TaxCategoryId;
use crate::repositories::{TaxRateRepository, TaxZoneRepository};
use crate::tax::TaxRate;

/// Resolves the applicable tax rate for a (category, address) pair.
///
/// Resolution is deterministic: among zones matching the address
/// country, a zone that also matches the region outranks a country-only
/// zone; among equally specific matches, the first configured zone with
/// a rate for the category wins.
pub struct TaxEngine<'a> {
    zones: &'a dyn TaxZoneRepository,
    rates: &'a dyn TaxRateRepository,
}

impl<'a> TaxEngine<'a> {
    /// Create an engine over zone and rate lookups.
    pub fn new(zones: &'a dyn TaxZoneRepository, rates: &'a dyn TaxRateRepository) -> Self {
        Self { zones, rates }
    }

    /// Resolve the rate for a category and address, or `None` when no
    /// configured zone covers the address.
    pub fn resolve_rate(&self, category: &TaxCategoryId, address: &Address) -> Option<TaxRate> {
        let zones = self.zones.all();
        let matching: Vec<_> = zones.iter().filter(|z| z.matches(address)).collect();

        let region_level = matching.iter().filter(|z| z.is_region_level());
        let country_level = matching.iter().filter(|z| !z.is_region_level());

        for zone in region_level.chain(country_level) {
            if let Some(rate) = self
                .rates
                .for_zone_and_category(&zone.id, category)
                .into_iter()
                .next()
            {
                return Some(rate);
            }
        }

        None
    }
}
