//! The checkout orchestrator.
//!
//! Sequences validation, customer resolution, coupon handling, stock
//! checks, calculation, payment, and finalization. Failure semantics:
//! insufficient stock prunes the offending line item and surfaces a
//! recoverable error; coupon and request problems surface as
//! validation errors with the cart untouched; gateway failures abort
//! with nothing committed; a stock race at commit time is fatal to the
//! attempt and never oversells.

use crate::cart::{Cart, CouponEngine};
use crate::catalog::StockLedger;
use crate::checkout::calculator::{Calculator, PriceOverride};
use crate::checkout::gateway::GatewayRegistry;
use crate::checkout::order::{Order, OrderStatus, PaymentStatus};
use crate::config::CommerceConfig;
use crate::error::CommerceError;
use crate::events::{CommerceEvent, Notifier};
use crate::ids::CartId;
use crate::repositories::{
    CartRepository, CouponRepository, CustomerRepository, OrderRepository, ProductRepository,
    TaxRateRepository, TaxZoneRepository,
};
use crate::shipping::ShippingResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request keys that never merge into cart data.
const EXCLUDED_KEYS: &[&str] = &[
    "_token", "_params", "_redirect", "gateway", "name", "email", "customer", "coupon",
];

/// A submitted checkout payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Customer name.
    pub name: Option<String>,
    /// Customer email.
    pub email: Option<String>,
    /// Gateway handle to charge through.
    pub gateway: Option<String>,
    /// Coupon code to apply.
    pub coupon: Option<String>,
    /// Gateway-specific payment fields.
    pub payment: BTreeMap<String, serde_json::Value>,
    /// Any remaining submitted fields; whitelisted ones merge into the
    /// cart's metadata.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The result of a completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The placed order.
    pub order: Order,
}

/// Sequences a cart through checkout to a placed order.
pub struct CheckoutOrchestrator<'a> {
    products: &'a dyn ProductRepository,
    customers: &'a dyn CustomerRepository,
    coupons: &'a dyn CouponRepository,
    carts: &'a dyn CartRepository,
    orders: &'a dyn OrderRepository,
    zones: &'a dyn TaxZoneRepository,
    rates: &'a dyn TaxRateRepository,
    shipping: &'a ShippingResolver,
    gateways: &'a GatewayRegistry,
    notifier: &'a dyn Notifier,
    config: &'a CommerceConfig,
    price_override: Option<&'a PriceOverride>,
    pre_checkout: Option<&'a dyn Fn(&Cart)>,
    post_checkout: Option<&'a dyn Fn(&Order)>,
}

impl<'a> CheckoutOrchestrator<'a> {
    /// Create an orchestrator over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: &'a dyn ProductRepository,
        customers: &'a dyn CustomerRepository,
        coupons: &'a dyn CouponRepository,
        carts: &'a dyn CartRepository,
        orders: &'a dyn OrderRepository,
        zones: &'a dyn TaxZoneRepository,
        rates: &'a dyn TaxRateRepository,
        shipping: &'a ShippingResolver,
        gateways: &'a GatewayRegistry,
        notifier: &'a dyn Notifier,
        config: &'a CommerceConfig,
    ) -> Self {
        Self {
            products,
            customers,
            coupons,
            carts,
            orders,
            zones,
            rates,
            shipping,
            gateways,
            notifier,
            config,
            price_override: None,
            pre_checkout: None,
            post_checkout: None,
        }
    }

    /// Install a pricing strategy for the calculation pipeline.
    pub fn with_price_override(mut self, hook: &'a PriceOverride) -> Self {
        self.price_override = Some(hook);
        self
    }

    /// Install a hook that runs before checkout starts.
    pub fn with_pre_checkout_hook(mut self, hook: &'a dyn Fn(&Cart)) -> Self {
        self.pre_checkout = Some(hook);
        self
    }

    /// Install a hook that runs after the order is placed.
    pub fn with_post_checkout_hook(mut self, hook: &'a dyn Fn(&Order)) -> Self {
        self.post_checkout = Some(hook);
        self
    }

    fn calculator(&self) -> Calculator<'a> {
        let calculator = Calculator::new(
            self.products,
            self.coupons,
            self.zones,
            self.rates,
            self.shipping,
            self.config,
        );
        match self.price_override {
            Some(hook) => calculator.with_price_override(hook),
            None => calculator,
        }
    }

    /// Run the full checkout sequence for a cart.
    pub fn checkout(
        &self,
        cart_id: &CartId,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, CommerceError> {
        let cart = self
            .carts
            .find(cart_id)
            .ok_or_else(|| CommerceError::CartNotFound(cart_id.clone()))?;

        // 1. Pre-checkout hook
        if let Some(hook) = self.pre_checkout {
            hook(&cart);
        }
        self.notifier.notify(&CommerceEvent::PreCheckout {
            cart_id: cart.id.clone(),
        });

        // Price the cart up front so coupon checks see real subtotals.
        let mut cart = self.calculator().calculate(cart)?;

        // 2. Validate the request payload
        self.validate_request(request)?;

        // 3. Resolve or create the customer
        self.resolve_customer(&mut cart, request)?;

        // 4. Validate and attach the coupon (no redemption yet)
        self.attach_coupon(&mut cart, request)?;

        // 5. Stock validation; prune the offending item on failure
        let ledger = StockLedger::new(
            self.products,
            self.notifier,
            self.config.low_stock_threshold,
        );
        if let Err(err) = ledger.validate(&cart) {
            if let CommerceError::InsufficientStock {
                ref product_id,
                ref variant,
                ..
            } = err
            {
                let product_id = product_id.clone();
                let variant = variant.clone();
                cart.items
                    .retain(|i| !(i.product_id == product_id && i.variant == variant));
                cart.needs_recalculation = true;
                self.carts.save(&cart)?;
            }
            return Err(err);
        }

        // 6. Merge whitelisted request fields into cart data
        self.merge_remaining_fields(&mut cart, request);

        // 7. Final calculation
        let cart = self.calculator().calculate(cart)?;

        // 8. Payment
        let payment = self.take_payment(&cart, request)?;

        // 9. Finalize: commit stock, place the order, redeem, clean up
        self.finalize(cart, payment)
    }

    fn validate_request(&self, request: &CheckoutRequest) -> Result<(), CommerceError> {
        if let Some(email) = &request.email {
            if !is_well_formed_email(email) {
                return Err(CommerceError::Validation(format!(
                    "invalid email address: {email}"
                )));
            }
        }

        if let Some(name) = &request.gateway {
            let gateway = self
                .gateways
                .get(name)
                .ok_or_else(|| CommerceError::UnknownGateway(name.clone()))?;

            let missing: Vec<&str> = gateway
                .purchase_rules()
                .iter()
                .filter(|field| !request.payment.contains_key(**field))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(CommerceError::Validation(format!(
                    "missing payment fields: {}",
                    missing.join(", ")
                )));
            }
        }

        Ok(())
    }

    fn resolve_customer(
        &self,
        cart: &mut Cart,
        request: &CheckoutRequest,
    ) -> Result<(), CommerceError> {
        let Some(email) = &request.email else {
            return Ok(());
        };

        let customer = match self.customers.find_by_email(email) {
            Some(mut existing) => {
                if let Some(name) = &request.name {
                    if existing.name.is_empty() {
                        existing.name = name.clone();
                        self.customers.save(&existing)?;
                    }
                }
                existing
            }
            None => self
                .customers
                .create(request.name.as_deref().unwrap_or(""), email)?,
        };

        cart.set_customer(customer.id);
        Ok(())
    }

    fn attach_coupon(
        &self,
        cart: &mut Cart,
        request: &CheckoutRequest,
    ) -> Result<(), CommerceError> {
        let Some(code) = &request.coupon else {
            return Ok(());
        };
        let code = crate::cart::Coupon::normalize_code(code);

        let coupon = self
            .coupons
            .find_by_code(&code)
            .ok_or_else(|| CommerceError::CouponNotFound(code.clone()))?;

        let prior_uses = cart
            .customer
            .as_ref()
            .map(|customer| self.orders.coupon_use_count(customer, &code))
            .unwrap_or(0);

        CouponEngine::validate(&coupon, cart, prior_uses)?;
        cart.apply_coupon(&code);
        Ok(())
    }

    fn merge_remaining_fields(&self, cart: &mut Cart, request: &CheckoutRequest) {
        let gateway_fields: Vec<&str> = request
            .gateway
            .as_deref()
            .and_then(|name| self.gateways.get(name))
            .map(|g| g.purchase_rules().to_vec())
            .unwrap_or_default();

        for (key, value) in &request.extra {
            if EXCLUDED_KEYS.contains(&key.as_str()) || gateway_fields.contains(&key.as_str()) {
                continue;
            }
            let value = match value.as_str() {
                Some("on") => serde_json::Value::Bool(true),
                Some("off") => serde_json::Value::Bool(false),
                _ => value.clone(),
            };
            cart.metadata.insert(key.clone(), value);
        }
    }

    /// Returns the payment status the order lands in, plus gateway
    /// context for the status log.
    fn take_payment(
        &self,
        cart: &Cart,
        request: &CheckoutRequest,
    ) -> Result<(PaymentStatus, BTreeMap<String, serde_json::Value>), CommerceError> {
        // Nothing to pay: mark paid without involving a gateway
        if cart.totals.grand_total.is_zero() {
            return Ok((PaymentStatus::Paid, BTreeMap::new()));
        }

        let name = request
            .gateway
            .as_deref()
            .ok_or(CommerceError::NoGatewayProvided)?;
        let gateway = self
            .gateways
            .get(name)
            .ok_or_else(|| CommerceError::UnknownGateway(name.to_string()))?;

        let response = gateway.purchase(&request.payment, cart)?;
        if !response.success {
            return Err(CommerceError::GatewayDeclined(format!(
                "purchase through {name} was not successful"
            )));
        }

        let mut context = BTreeMap::new();
        context.insert(
            "gateway".to_string(),
            serde_json::Value::String(name.to_string()),
        );
        if let Some(reference) = &response.reference {
            context.insert(
                "reference".to_string(),
                serde_json::Value::String(reference.clone()),
            );
        }

        let status = if response.captured {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PaymentPending
        };
        Ok((status, context))
    }

    fn finalize(
        &self,
        cart: Cart,
        payment: (PaymentStatus, BTreeMap<String, serde_json::Value>),
    ) -> Result<CheckoutOutcome, CommerceError> {
        let (payment_status, payment_context) = payment;

        // Commit stock before anything else persists; losing the race
        // here fails the attempt without a dangling order.
        let ledger = StockLedger::new(
            self.products,
            self.notifier,
            self.config.low_stock_threshold,
        );
        ledger.commit(&cart)?;

        let mut order = Order::from_cart(&cart);
        self.orders.save(&mut order)?;

        let transition = order.update_order_status(OrderStatus::Placed, BTreeMap::new())?;
        self.notifier.notify(&CommerceEvent::OrderStatusUpdated {
            order_id: order.id.clone(),
            previous: transition.previous,
            current: transition.current,
        });

        if payment_status == PaymentStatus::Paid {
            let transition = order.update_payment_status(PaymentStatus::Paid, payment_context)?;
            self.notifier.notify(&CommerceEvent::PaymentStatusUpdated {
                order_id: order.id.clone(),
                previous: transition.previous,
                current: transition.current,
            });
        }

        self.orders.save(&mut order)?;

        // Redeem the coupon now that checkout is confirmed. A race on
        // the last redemption is logged, never oversold.
        if let Some(code) = &order.coupon_code {
            if let Err(err) = self.coupons.redeem(code) {
                tracing::warn!(%code, %err, "coupon could not be redeemed at finalization");
            }
        }

        if let Some(customer_id) = &order.customer {
            if let Some(mut customer) = self.customers.find(customer_id) {
                customer.add_order(order.id.clone());
                self.customers.save(&customer)?;
            }
        }

        self.carts.delete(&cart.id)?;

        self.notifier.notify(&CommerceEvent::PostCheckout {
            order_id: order.id.clone(),
            order_number: order.order_number().unwrap_or_default(),
        });
        if let Some(hook) = self.post_checkout {
            hook(&order);
        }

        Ok(CheckoutOutcome { order })
    }

    /// Refund a paid order through a gateway.
    ///
    /// A refund covering the grand total moves the order to
    /// `Refunded`; anything less moves it to `PartiallyRefunded`. The
    /// amount and reason land in the status log.
    pub fn refund(
        &self,
        order_id: &crate::ids::OrderId,
        gateway_name: &str,
        reason: Option<&str>,
    ) -> Result<crate::checkout::gateway::RefundResult, CommerceError> {
        let mut order = self
            .orders
            .find(order_id)
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.clone()))?;

        let gateway = self
            .gateways
            .get(gateway_name)
            .ok_or_else(|| CommerceError::UnknownGateway(gateway_name.to_string()))?;

        let result = gateway.refund(&order)?;
        if !result.success {
            return Err(CommerceError::GatewayDeclined(format!(
                "refund through {gateway_name} was not successful"
            )));
        }

        let next = if result.amount.amount >= order.totals.grand_total.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };

        let mut data = BTreeMap::new();
        data.insert(
            "amount".to_string(),
            serde_json::Value::from(result.amount.amount),
        );
        if let Some(reason) = reason {
            data.insert(
                "reason".to_string(),
                serde_json::Value::String(reason.to_string()),
            );
        }

        let transition = order.update_payment_status(next, data)?;
        self.notifier.notify(&CommerceEvent::PaymentStatusUpdated {
            order_id: order.id.clone(),
            previous: transition.previous,
            current: transition.current,
        });
        self.orders.save(&mut order)?;

        Ok(result)
    }
}

/// Minimal structural email check: one `@`, non-empty local part, a
/// dot somewhere in the domain, no whitespace.
fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
