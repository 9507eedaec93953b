//! Commerce configuration.
//!
//! A typed configuration struct with serde defaults, loadable from
//! TOML. Tax behaviours mirror the policy knobs described in the tax
//! engine: what to do when no rate resolves, and when no taxable
//! address is available.

use crate::address::Address;
use crate::error::CommerceError;
use crate::ids::{TaxCategoryId, TaxRateId};
use crate::money::Currency;
use serde::{Deserialize, Serialize};

/// Which cart address taxes are calculated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxAddressSource {
    /// Use the billing address.
    #[default]
    Billing,
    /// Use the shipping address.
    Shipping,
}

/// Policy when no tax rate resolves for a (category, address) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoRateBehaviour {
    /// Fall back to the configured default rate.
    DefaultRate,
    /// Proceed with zero tax.
    #[default]
    NoTax,
    /// Abort the whole checkout transaction.
    PreventCheckout,
}

/// Policy when no taxable address is available at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoAddressBehaviour {
    /// Fall back to the configured default address.
    #[default]
    DefaultAddress,
    /// Abort the whole checkout transaction.
    PreventCheckout,
}

/// Top-level commerce configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    /// Store currency.
    pub currency: Currency,
    /// Stock level at or below which a "running low" signal fires.
    pub low_stock_threshold: i64,
    /// First order number issued when no orders exist yet.
    pub minimum_order_number: u64,
    /// When true, all prices are treated as tax-inclusive regardless
    /// of the per-rate flag; line totals are never re-inflated by tax.
    pub price_includes_tax: bool,
    /// Which address taxes are calculated against.
    pub tax_address: TaxAddressSource,
    /// Policy when no rate resolves.
    pub no_rate: NoRateBehaviour,
    /// Fallback rate for [`NoRateBehaviour::DefaultRate`].
    pub default_tax_rate: Option<TaxRateId>,
    /// Policy when no taxable address is available.
    pub no_address: NoAddressBehaviour,
    /// Fallback address for [`NoAddressBehaviour::DefaultAddress`].
    pub default_address: Option<Address>,
    /// Tax category applied to shipping costs. `None` leaves shipping
    /// untaxed.
    pub shipping_tax_category: Option<TaxCategoryId>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            low_stock_threshold: 10,
            minimum_order_number: 1000,
            price_includes_tax: false,
            tax_address: TaxAddressSource::default(),
            no_rate: NoRateBehaviour::default(),
            default_tax_rate: None,
            no_address: NoAddressBehaviour::default(),
            default_address: None,
            shipping_tax_category: None,
        }
    }
}

impl CommerceConfig {
    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, CommerceError> {
        toml::from_str(source).map_err(|e| CommerceError::Validation(e.to_string()))
    }
}
