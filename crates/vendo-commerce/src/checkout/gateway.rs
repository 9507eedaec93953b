//! The payment gateway capability.
//!
//! Concrete gateways (card processors, wallets) implement
//! [`PaymentGateway`] against their own wire protocols; the checkout
//! orchestrator only ever sees this interface.

use crate::cart::Cart;
use crate::checkout::order::Order;
use crate::error::CommerceError;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A gateway's answer to a prepare or purchase call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayResponse {
    /// Whether the call succeeded.
    pub success: bool,
    /// Gateway-side reference (charge id, transaction id).
    pub reference: Option<String>,
    /// Whether funds were captured. Uncaptured success leaves the
    /// order awaiting payment (e.g., pay on delivery).
    pub captured: bool,
    /// Gateway-specific payload, passed through unmodified.
    pub data: BTreeMap<String, serde_json::Value>,
}

impl GatewayResponse {
    /// A successful, captured response.
    pub fn captured(reference: impl Into<String>) -> Self {
        Self {
            success: true,
            reference: Some(reference.into()),
            captured: true,
            data: BTreeMap::new(),
        }
    }

    /// A successful response that did not capture funds.
    pub fn uncaptured() -> Self {
        Self {
            success: true,
            reference: None,
            captured: false,
            data: BTreeMap::new(),
        }
    }
}

/// The result of a refund call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundResult {
    /// Whether the refund succeeded.
    pub success: bool,
    /// Amount refunded.
    pub amount: Money,
    /// Gateway-side reference for the refund.
    pub reference: Option<String>,
}

/// A payment processor integration.
pub trait PaymentGateway {
    /// Registry handle (e.g., "offline").
    fn name(&self) -> &'static str;

    /// Payload fields this gateway requires at purchase time.
    fn purchase_rules(&self) -> &'static [&'static str] {
        &[]
    }

    /// Set up a payment for the cart (e.g., create a payment intent).
    fn prepare(&self, cart: &Cart) -> Result<GatewayResponse, CommerceError>;

    /// Take payment for the cart.
    fn purchase(
        &self,
        payload: &BTreeMap<String, serde_json::Value>,
        cart: &Cart,
    ) -> Result<GatewayResponse, CommerceError>;

    /// Refund a paid order.
    fn refund(&self, order: &Order) -> Result<RefundResult, CommerceError>;

    /// Handle an asynchronous callback from the gateway.
    fn webhook(&self, payload: &serde_json::Value) -> Result<(), CommerceError> {
        let _ = payload;
        Ok(())
    }
}

/// Registry of available gateways, keyed by name.
pub struct GatewayRegistry {
    gateways: Vec<Box<dyn PaymentGateway>>,
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            gateways: Vec::new(),
        }
    }

    /// Register a gateway.
    pub fn register(mut self, gateway: impl PaymentGateway + 'static) -> Self {
        self.gateways.push(Box::new(gateway));
        self
    }

    /// Look up a gateway by name.
    pub fn get(&self, name: &str) -> Option<&dyn PaymentGateway> {
        self.gateways
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }
}

/// A gateway that authorizes without taking payment.
///
/// Used for pay-on-delivery flows: the purchase succeeds but funds are
/// not captured, so the order is placed with payment still pending.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

impl PaymentGateway for OfflineGateway {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn prepare(&self, _cart: &Cart) -> Result<GatewayResponse, CommerceError> {
        Ok(GatewayResponse::uncaptured())
    }

    fn purchase(
        &self,
        _payload: &BTreeMap<String, serde_json::Value>,
        _cart: &Cart,
    ) -> Result<GatewayResponse, CommerceError> {
        Ok(GatewayResponse::uncaptured())
    }

    fn refund(&self, order: &Order) -> Result<RefundResult, CommerceError> {
        // Nothing was captured, so there is nothing to give back.
        Ok(RefundResult {
            success: true,
            amount: Money::zero(order.currency),
            reference: None,
        })
    }
}
