//! Coupon types and the coupon engine.
//!
//! Validation and discount computation are side-effect-free; the
//! redemption counter only moves at checkout finalization, through the
//! coupon repository's atomic `redeem`.

use crate::cart::cart::Cart;
use crate::error::CommerceError;
use crate::ids::{CouponId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// The value of a coupon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CouponValue {
    /// Percentage off the eligible subtotal (integer percent).
    Percentage(i64),
    /// Fixed amount off, capped at the eligible subtotal.
    FixedAmount(Money),
}

/// A coupon definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Coupon code, stored case-normalized.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Discount value.
    pub value: CouponValue,
    /// Minimum cart subtotal for the coupon to apply.
    pub minimum_cart_value: Option<Money>,
    /// Eligible products. Empty means every product is eligible.
    pub products: Vec<ProductId>,
    /// Maximum total redemptions. `None` means unlimited.
    pub maximum_uses: Option<i64>,
    /// Redemptions so far. Never exceeds `maximum_uses`.
    pub redeemed: i64,
    /// Per-customer redemption limit.
    pub per_customer_limit: Option<i64>,
    /// Expiry as a Unix timestamp.
    pub expires_at: Option<i64>,
    /// Whether the coupon can currently be applied.
    pub enabled: bool,
}

impl Coupon {
    /// Create a percentage coupon.
    pub fn percentage(code: &str, name: impl Into<String>, percent: i64) -> Self {
        Self {
            id: CouponId::generate(),
            code: Self::normalize_code(code),
            name: name.into(),
            value: CouponValue::Percentage(percent),
            minimum_cart_value: None,
            products: Vec::new(),
            maximum_uses: None,
            redeemed: 0,
            per_customer_limit: None,
            expires_at: None,
            enabled: true,
        }
    }

    /// Create a fixed-amount coupon.
    pub fn fixed_amount(code: &str, name: impl Into<String>, amount: Money) -> Self {
        Self {
            id: CouponId::generate(),
            code: Self::normalize_code(code),
            name: name.into(),
            value: CouponValue::FixedAmount(amount),
            minimum_cart_value: None,
            products: Vec::new(),
            maximum_uses: None,
            redeemed: 0,
            per_customer_limit: None,
            expires_at: None,
            enabled: true,
        }
    }

    /// Restrict the coupon to a set of products.
    pub fn with_products(mut self, products: Vec<ProductId>) -> Self {
        self.products = products;
        self
    }

    /// Require a minimum cart subtotal.
    pub fn with_minimum_cart_value(mut self, minimum: Money) -> Self {
        self.minimum_cart_value = Some(minimum);
        self
    }

    /// Limit total redemptions.
    pub fn with_maximum_uses(mut self, maximum: i64) -> Self {
        self.maximum_uses = Some(maximum);
        self
    }

    /// Limit redemptions per customer.
    pub fn with_per_customer_limit(mut self, limit: i64) -> Self {
        self.per_customer_limit = Some(limit);
        self
    }

    /// Set an expiry timestamp.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.expires_at = Some(timestamp);
        self
    }

    /// Case-normalize a coupon code for storage and lookup.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_lowercase()
    }

    /// Check if the coupon is past its expiry date.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|ends| current_timestamp() > ends)
            .unwrap_or(false)
    }

    /// Check if the redemption counter has reached the maximum.
    pub fn is_exhausted(&self) -> bool {
        self.maximum_uses
            .map(|limit| self.redeemed >= limit)
            .unwrap_or(false)
    }
}

/// Validates coupon applicability and computes discount allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponEngine;

impl CouponEngine {
    /// Validate a coupon against a (calculated) cart.
    ///
    /// `prior_uses_by_customer` is the customer's completed redemptions
    /// of this coupon; pass zero for guests or when unknown.
    pub fn validate(
        coupon: &Coupon,
        cart: &Cart,
        prior_uses_by_customer: i64,
    ) -> Result<(), CommerceError> {
        if !coupon.enabled || coupon.is_expired() {
            return Err(CommerceError::CouponExpired(coupon.code.clone()));
        }
        if coupon.is_exhausted() {
            return Err(CommerceError::CouponExhausted(coupon.code.clone()));
        }
        if let Some(limit) = coupon.per_customer_limit {
            if prior_uses_by_customer >= limit {
                return Err(CommerceError::CouponExhausted(coupon.code.clone()));
            }
        }
        if Self::eligible_indices(coupon, cart).is_empty() {
            return Err(CommerceError::CouponNotApplicable(coupon.code.clone()));
        }
        if let Some(minimum) = &coupon.minimum_cart_value {
            if minimum.currency != cart.currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: cart.currency.code().to_string(),
                    got: minimum.currency.code().to_string(),
                });
            }
            if cart.totals.sub_total.amount < minimum.amount {
                return Err(CommerceError::MinimumNotMet {
                    minimum: *minimum,
                    subtotal: cart.totals.sub_total,
                });
            }
        }
        Ok(())
    }

    /// Indices of the cart line items this coupon applies to.
    pub fn eligible_indices(coupon: &Coupon, cart: &Cart) -> Vec<usize> {
        cart.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                coupon.products.is_empty() || coupon.products.contains(&item.product_id)
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Total discount this coupon yields for the cart.
    ///
    /// Percentage coupons discount the eligible subtotal; fixed-amount
    /// coupons are capped at it.
    pub fn discount_for(coupon: &Coupon, cart: &Cart) -> Result<Money, CommerceError> {
        let eligible = Self::eligible_indices(coupon, cart);
        let mut eligible_subtotal = Money::zero(cart.currency);
        for index in &eligible {
            if let Some(item) = cart.items.get(*index) {
                eligible_subtotal = eligible_subtotal.add(&item.sub_total)?;
            }
        }

        match &coupon.value {
            CouponValue::Percentage(percent) => eligible_subtotal.percentage(*percent),
            CouponValue::FixedAmount(amount) => {
                if amount.currency != cart.currency {
                    return Err(CommerceError::CurrencyMismatch {
                        expected: cart.currency.code().to_string(),
                        got: amount.currency.code().to_string(),
                    });
                }
                if amount.amount > eligible_subtotal.amount {
                    Ok(eligible_subtotal)
                } else {
                    Ok(*amount)
                }
            }
        }
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
