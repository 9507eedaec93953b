//! Commerce error types.

use crate::ids::{CartId, OrderId, ProductId, ShippingMethodId, VariantKey};
use crate::money::Money;
use thiserror::Error;

/// Errors that can occur in commerce operations.
///
/// Variants fall into four groups: validation errors (bad input,
/// surfaced to the caller), business-rule failures (recoverable, state
/// left consistent), concurrency-race failures (fatal to the current
/// attempt), and integration failures (gateway/store trouble).
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Variant not found on a product.
    #[error("Variant not found: {variant} on product {product_id}")]
    VariantNotFound {
        product_id: ProductId,
        variant: VariantKey,
    },

    /// Cart not found.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Coupon code does not exist.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Coupon is disabled or past its expiry date.
    #[error("Coupon has expired: {0}")]
    CouponExpired(String),

    /// Coupon redemption count has reached its maximum.
    #[error("Coupon has been fully redeemed: {0}")]
    CouponExhausted(String),

    /// No line item matches the coupon's product restriction.
    #[error("Coupon does not apply to any item in the cart: {0}")]
    CouponNotApplicable(String),

    /// Cart subtotal is below the coupon's configured minimum.
    #[error("Cart subtotal {subtotal} is below the coupon minimum {minimum}")]
    MinimumNotMet { minimum: Money, subtotal: Money },

    /// Not enough stock to cover a line item, detected before commit.
    #[error(
        "Insufficient stock for {product_id} ({variant:?}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        variant: Option<VariantKey>,
        requested: i64,
        available: i64,
    },

    /// Stock ran out between validation and commit. Fatal to the
    /// current checkout attempt; stock is never left negative.
    #[error("Stock for {product_id} ({variant:?}) ran out during checkout")]
    StockRace {
        product_id: ProductId,
        variant: Option<VariantKey>,
    },

    /// A configured policy aborted the checkout transaction.
    #[error("Checkout prevented: {0}")]
    PreventCheckout(String),

    /// A non-zero total requires a payment gateway.
    #[error("No payment gateway provided")]
    NoGatewayProvided,

    /// Requested gateway is not registered.
    #[error("Unknown payment gateway: {0}")]
    UnknownGateway(String),

    /// The gateway rejected the payment.
    #[error("Gateway declined the payment: {0}")]
    GatewayDeclined(String),

    /// The gateway could not be reached or misbehaved.
    #[error("Gateway error: {0}")]
    GatewayError(String),

    /// Shipping method is not registered.
    #[error("Shipping method not found: {0}")]
    ShippingMethodNotFound(ShippingMethodId),

    /// Shipping method is not available for the destination address.
    #[error("Shipping method not available for this address: {0}")]
    ShippingUnavailable(ShippingMethodId),

    /// Disallowed order/payment status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Allocation requires at least one positive weight.
    #[error("Cannot allocate across an empty or zero-weight distribution")]
    InvalidAllocation,

    /// No formatter registered for the requested locale.
    #[error("No formatter available for locale: {0}")]
    FormattingUnavailable(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage backend error.
    #[error("Store error: {0}")]
    Store(String),
}

impl CommerceError {
    /// Whether the caller can retry with adjusted input.
    ///
    /// Race failures, overflow, and storage trouble are fatal to the
    /// current attempt; everything else leaves state consistent enough
    /// for the caller to fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CommerceError::StockRace { .. }
                | CommerceError::Overflow
                | CommerceError::Store(_)
                | CommerceError::GatewayError(_)
        )
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let insufficient = CommerceError::InsufficientStock {
            product_id: ProductId::new("p1"),
            variant: None,
            requested: 2,
            available: 1,
        };
        assert!(insufficient.is_recoverable());

        let race = CommerceError::StockRace {
            product_id: ProductId::new("p1"),
            variant: None,
        };
        assert!(!race.is_recoverable());

        assert!(CommerceError::CouponExhausted("save10".into()).is_recoverable());
        assert!(!CommerceError::Store("disk full".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = CommerceError::ProductNotFound(ProductId::new("prod-1"));
        assert_eq!(err.to_string(), "Product not found: prod-1");

        let err = CommerceError::NoGatewayProvided;
        assert_eq!(err.to_string(), "No payment gateway provided");
    }
}
