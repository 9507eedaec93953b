//! Address types.

use serde::{Deserialize, Serialize};

/// A postal address.
///
/// `country_code` and `region_code` drive tax zone matching; the rest
/// is carried for shipping and display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    /// Recipient name.
    pub name: String,
    /// Address line 1.
    pub line1: String,
    /// Address line 2 (apt, suite, etc.).
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// Region code (e.g., "gb-sct"), used for region-level tax zones.
    pub region_code: Option<String>,
    /// Postal/ZIP code.
    pub postal_code: String,
    /// Country code (e.g., "GB").
    pub country_code: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            region_code: None,
            postal_code: postal_code.into(),
            country_code: country_code.into(),
        }
    }

    /// Set the region code.
    pub fn with_region(mut self, region_code: impl Into<String>) -> Self {
        self.region_code = Some(region_code.into());
        self
    }

    /// Format as a single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.clone()];
        if let Some(ref line2) = self.line2 {
            parts.push(line2.clone());
        }
        parts.push(self.city.clone());
        parts.push(self.postal_code.clone());
        parts.push(self.country_code.clone());
        parts.join(", ")
    }

    /// Check if the address is complete enough to ship to.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && !self.line1.is_empty()
            && !self.city.is_empty()
            && !self.postal_code.is_empty()
            && !self.country_code.is_empty()
    }
}
