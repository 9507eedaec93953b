//! Order types and the order state machine.
//!
//! An order is an immutable-once-placed snapshot of a cart. Its two
//! status dimensions (order status, payment status) move independently
//! through one-directional transition tables, and only through
//! [`Order::update_order_status`] and [`Order::update_payment_status`]
//! — both append to the status log, so the log is the full history.

use crate::address::Address;
use crate::cart::{Cart, LineItem, Totals};
use crate::error::CommerceError;
use crate::ids::{CartId, CustomerId, OrderId, ShippingMethodId};
use crate::money::Currency;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Still a cart; checkout has not completed.
    #[default]
    Cart,
    /// Checkout completed.
    Placed,
    /// Handed to the carrier.
    Dispatched,
    /// Cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Cart => "cart",
            OrderStatus::Placed => "placed",
            OrderStatus::Dispatched => "dispatched",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the status permits moving to `next`. Transitions are
    /// one-directional: nothing returns to `Cart` once placed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Cart, OrderStatus::Placed)
                | (OrderStatus::Placed, OrderStatus::Dispatched)
                | (OrderStatus::Placed, OrderStatus::Cancelled)
                | (OrderStatus::Dispatched, OrderStatus::Cancelled)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

/// Payment status, independent of (but correlated with) order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting payment (e.g., pay on delivery).
    #[default]
    PaymentPending,
    /// Payment captured.
    Paid,
    /// Fully refunded.
    Refunded,
    /// Partially refunded.
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PaymentPending => "payment_pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    /// Whether the status permits moving to `next`. Another partial
    /// refund on a partially refunded order is a valid transition.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::PaymentPending, PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
                | (PaymentStatus::Paid, PaymentStatus::PartiallyRefunded)
                | (PaymentStatus::PartiallyRefunded, PaymentStatus::Refunded)
                | (PaymentStatus::PartiallyRefunded, PaymentStatus::PartiallyRefunded)
        )
    }
}

/// One entry of an order's status-change log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusLogEntry {
    /// The status entered.
    pub status: String,
    /// When the transition happened.
    pub timestamp: i64,
    /// Contextual data (e.g., refund reason, gateway reference).
    pub data: BTreeMap<String, serde_json::Value>,
}

/// The result of a status transition: prior and new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition<S> {
    /// State before the transition.
    pub previous: S,
    /// State after the transition.
    pub current: S,
}

/// A completed (or completing) order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Sequential order number, assigned exactly once at first save.
    order_number: Option<u64>,
    /// Order status. Mutated only via [`Order::update_order_status`].
    status: OrderStatus,
    /// Payment status. Mutated only via [`Order::update_payment_status`].
    payment_status: PaymentStatus,
    /// Status-change log, append-only.
    status_log: Vec<StatusLogEntry>,
    /// The cart this order was created from.
    pub cart: CartId,
    /// Customer, if known.
    pub customer: Option<CustomerId>,
    /// Redeemed coupon code.
    pub coupon_code: Option<String>,
    /// Line items, snapshotted from the cart.
    pub line_items: Vec<LineItem>,
    /// Shipping method used.
    pub shipping_method: Option<ShippingMethodId>,
    /// Billing address.
    pub billing_address: Option<Address>,
    /// Shipping address.
    pub shipping_address: Option<Address>,
    /// Order currency.
    pub currency: Currency,
    /// Final totals.
    #[serde(flatten)]
    pub totals: Totals,
    /// Additional metadata, passed through unmodified.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Order {
    /// Snapshot a cart into a new, not-yet-placed order.
    pub fn from_cart(cart: &Cart) -> Self {
        let now = current_timestamp();
        Self {
            id: OrderId::generate(),
            order_number: None,
            status: OrderStatus::Cart,
            payment_status: PaymentStatus::PaymentPending,
            status_log: Vec::new(),
            cart: cart.id.clone(),
            customer: cart.customer.clone(),
            coupon_code: cart.coupon_code.clone(),
            line_items: cart.items.clone(),
            shipping_method: cart.shipping_method.clone(),
            billing_address: cart.billing_address.clone(),
            shipping_address: cart.shipping_address.clone(),
            currency: cart.currency,
            totals: cart.totals,
            metadata: cart.metadata.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The assigned order number, if saved.
    pub fn order_number(&self) -> Option<u64> {
        self.order_number
    }

    /// Assign the order number. Repositories call this on first save;
    /// an already-numbered order refuses reassignment.
    pub fn assign_order_number(&mut self, number: u64) -> Result<(), CommerceError> {
        if self.order_number.is_some() {
            return Err(CommerceError::Validation(
                "order number already assigned".to_string(),
            ));
        }
        self.order_number = Some(number);
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// Current order status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Current payment status.
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// The status-change log, oldest first.
    pub fn status_log(&self) -> &[StatusLogEntry] {
        &self.status_log
    }

    /// Check if the order has been paid (fully or partially refunded
    /// orders were paid at some point).
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded
        )
    }

    /// Get total item count.
    pub fn item_count(&self) -> i64 {
        self.line_items.iter().map(|i| i.quantity).sum()
    }

    /// Transition the order status, appending to the status log.
    pub fn update_order_status(
        &mut self,
        next: OrderStatus,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<StatusTransition<OrderStatus>, CommerceError> {
        if !self.status.can_transition_to(next) {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let previous = self.status;
        self.status = next;
        self.push_log(next.as_str(), data);

        tracing::info!(
            order_id = %self.id,
            from = previous.as_str(),
            to = next.as_str(),
            "order status updated"
        );

        Ok(StatusTransition {
            previous,
            current: next,
        })
    }

    /// Transition the payment status, appending to the status log.
    pub fn update_payment_status(
        &mut self,
        next: PaymentStatus,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<StatusTransition<PaymentStatus>, CommerceError> {
        if !self.payment_status.can_transition_to(next) {
            return Err(CommerceError::InvalidStatusTransition {
                from: self.payment_status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let previous = self.payment_status;
        self.payment_status = next;
        self.push_log(next.as_str(), data);

        tracing::info!(
            order_id = %self.id,
            from = previous.as_str(),
            to = next.as_str(),
            "payment status updated"
        );

        Ok(StatusTransition {
            previous,
            current: next,
        })
    }

    fn push_log(&mut self, status: &str, data: BTreeMap<String, serde_json::Value>) {
        let now = current_timestamp();
        self.status_log.push(StatusLogEntry {
            status: status.to_string(),
            timestamp: now,
            data,
        });
        self.updated_at = now;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::from_cart(&Cart::new(Currency::GBP))
    }

    #[test]
    fn test_new_order_defaults() {
        let order = order();
        assert_eq!(order.status(), OrderStatus::Cart);
        assert_eq!(order.payment_status(), PaymentStatus::PaymentPending);
        assert!(order.order_number().is_none());
        assert!(order.status_log().is_empty());
    }

    #[test]
    fn test_place_order() {
        let mut order = order();
        let transition = order
            .update_order_status(OrderStatus::Placed, BTreeMap::new())
            .unwrap();

        assert_eq!(transition.previous, OrderStatus::Cart);
        assert_eq!(transition.current, OrderStatus::Placed);
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.status_log().len(), 1);
        assert_eq!(order.status_log()[0].status, "placed");
    }

    #[test]
    fn test_no_transition_back_to_cart() {
        let mut order = order();
        order
            .update_order_status(OrderStatus::Placed, BTreeMap::new())
            .unwrap();

        assert!(matches!(
            order.update_order_status(OrderStatus::Cart, BTreeMap::new()),
            Err(CommerceError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut order = order();
        order
            .update_order_status(OrderStatus::Placed, BTreeMap::new())
            .unwrap();
        order
            .update_order_status(OrderStatus::Cancelled, BTreeMap::new())
            .unwrap();

        assert!(order.status().is_terminal());
        assert!(order
            .update_order_status(OrderStatus::Dispatched, BTreeMap::new())
            .is_err());
    }

    #[test]
    fn test_status_dimensions_are_independent() {
        // Pay-on-delivery: Placed while PaymentPending
        let mut order = order();
        order
            .update_order_status(OrderStatus::Placed, BTreeMap::new())
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.payment_status(), PaymentStatus::PaymentPending);
        assert!(!order.is_paid());

        order
            .update_payment_status(PaymentStatus::Paid, BTreeMap::new())
            .unwrap();
        assert!(order.is_paid());
    }

    #[test]
    fn test_refund_path() {
        let mut order = order();
        order
            .update_payment_status(PaymentStatus::Paid, BTreeMap::new())
            .unwrap();

        let mut data = BTreeMap::new();
        data.insert(
            "reason".to_string(),
            serde_json::Value::String("damaged in transit".to_string()),
        );
        order
            .update_payment_status(PaymentStatus::PartiallyRefunded, data)
            .unwrap();
        order
            .update_payment_status(PaymentStatus::Refunded, BTreeMap::new())
            .unwrap();

        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        let log = order.status_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].status, "partially_refunded");
        assert_eq!(
            log[1].data.get("reason").and_then(|v| v.as_str()),
            Some("damaged in transit")
        );
    }

    #[test]
    fn test_cannot_refund_unpaid() {
        let mut order = order();
        assert!(order
            .update_payment_status(PaymentStatus::Refunded, BTreeMap::new())
            .is_err());
    }

    #[test]
    fn test_order_number_assigned_once() {
        let mut order = order();
        order.assign_order_number(1000).unwrap();
        assert_eq!(order.order_number(), Some(1000));
        assert!(order.assign_order_number(1001).is_err());
        assert_eq!(order.order_number(), Some(1000));
    }

    #[test]
    fn test_snapshot_carries_cart_contents() {
        use crate::ids::ProductId;

        let mut cart = Cart::new(Currency::GBP);
        cart.add_item(ProductId::new("prod-1"), None, 2).unwrap();
        cart.apply_coupon("SAVE10");

        let order = Order::from_cart(&cart);
        assert_eq!(order.cart, cart.id);
        assert_eq!(order.line_items.len(), 1);
        assert_eq!(order.coupon_code.as_deref(), Some("save10"));
        assert_eq!(order.item_count(), 2);
    }
}
