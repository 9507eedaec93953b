//! Commerce events and notification delivery.
//!
//! Events are fire-and-forget: delivery failures never affect the
//! transactional outcome of the operation that raised them.

use crate::checkout::order::{OrderStatus, PaymentStatus};
use crate::ids::{CartId, OrderId, ProductId, VariantKey};

/// An event raised by the commerce core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommerceEvent {
    /// Checkout is about to start for a cart.
    PreCheckout { cart_id: CartId },
    /// Checkout completed and an order was placed.
    PostCheckout {
        order_id: OrderId,
        order_number: u64,
    },
    /// Stock for a purchasable dropped to or below the low threshold.
    StockRunningLow {
        product_id: ProductId,
        variant: Option<VariantKey>,
        remaining: i64,
    },
    /// Stock for a purchasable reached zero.
    StockRunOut {
        product_id: ProductId,
        variant: Option<VariantKey>,
    },
    /// An order's status changed.
    OrderStatusUpdated {
        order_id: OrderId,
        previous: OrderStatus,
        current: OrderStatus,
    },
    /// An order's payment status changed.
    PaymentStatusUpdated {
        order_id: OrderId,
        previous: PaymentStatus,
        current: PaymentStatus,
    },
}

/// Receives commerce events.
pub trait Notifier {
    /// Deliver an event. Must not block on or propagate failures.
    fn notify(&self, event: &CommerceEvent);
}

/// Default notifier: writes events to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &CommerceEvent) {
        match event {
            CommerceEvent::PreCheckout { cart_id } => {
                tracing::info!(cart_id = %cart_id, "checkout started");
            }
            CommerceEvent::PostCheckout {
                order_id,
                order_number,
            } => {
                tracing::info!(order_id = %order_id, order_number, "checkout complete");
            }
            CommerceEvent::StockRunningLow {
                product_id,
                variant,
                remaining,
            } => {
                tracing::warn!(
                    product_id = %product_id,
                    variant = ?variant,
                    remaining,
                    "stock running low"
                );
            }
            CommerceEvent::StockRunOut {
                product_id,
                variant,
            } => {
                tracing::warn!(product_id = %product_id, variant = ?variant, "stock ran out");
            }
            CommerceEvent::OrderStatusUpdated {
                order_id,
                previous,
                current,
            } => {
                tracing::info!(
                    order_id = %order_id,
                    from = previous.as_str(),
                    to = current.as_str(),
                    "order status updated"
                );
            }
            CommerceEvent::PaymentStatusUpdated {
                order_id,
                previous,
                current,
            } => {
                tracing::info!(
                    order_id = %order_id,
                    from = previous.as_str(),
                    to = current.as_str(),
                    "payment status updated"
                );
            }
        }
    }
}
