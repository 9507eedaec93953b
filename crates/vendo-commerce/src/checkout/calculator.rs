//! The cart calculation pipeline.
//!
//! Six stages run in a fixed order: reset totals, calculate line
//! items, apply coupon discounts, apply shipping, calculate taxes,
//! calculate totals. The pipeline is side-effect-free and idempotent:
//! the same cart content always produces the same derived totals, and
//! it never fails for ordinary pricing (zero tax, zero discount, and
//! zero shipping are valid zero-values). Only configured policy
//! violations ([`CommerceError::PreventCheckout`]) abort it.

use crate::address::Address;
use crate::cart::{Cart, CouponEngine, LineItem, TaxLine, Totals};
use crate::config::{CommerceConfig, NoAddressBehaviour, NoRateBehaviour};
use crate::error::CommerceError;
use crate::money::Money;
use crate::repositories::{
    CouponRepository, ProductRepository, TaxRateRepository, TaxZoneRepository,
};
use crate::shipping::ShippingResolver;
use crate::tax::{TaxEngine, TaxRate};

/// Pricing strategy that overrides product and variant price lookups.
pub type PriceOverride = dyn Fn(&Cart, &LineItem) -> Money;

/// Derives a cart's pricing: line items, discounts, shipping, taxes,
/// and totals.
pub struct Calculator<'a> {
    products: &'a dyn ProductRepository,
    coupons: &'a dyn CouponRepository,
    zones: &'a dyn TaxZoneRepository,
    rates: &'a dyn TaxRateRepository,
    shipping: &'a ShippingResolver,
    config: &'a CommerceConfig,
    price_override: Option<&'a PriceOverride>,
}

impl<'a> Calculator<'a> {
    /// Create a calculator over its collaborators.
    pub fn new(
        products: &'a dyn ProductRepository,
        coupons: &'a dyn CouponRepository,
        zones: &'a dyn TaxZoneRepository,
        rates: &'a dyn TaxRateRepository,
        shipping: &'a ShippingResolver,
        config: &'a CommerceConfig,
    ) -> Self {
        Self {
            products,
            coupons,
            zones,
            rates,
            shipping,
            config,
            price_override: None,
        }
    }

    /// Install a pricing strategy that takes precedence over product
    /// and variant price lookups.
    pub fn with_price_override(mut self, hook: &'a PriceOverride) -> Self {
        self.price_override = Some(hook);
        self
    }

    /// Run the pipeline, returning the fully priced cart.
    pub fn calculate(&self, mut cart: Cart) -> Result<Cart, CommerceError> {
        self.reset_totals(&mut cart);
        self.calculate_line_items(&mut cart)?;
        self.apply_coupon_discounts(&mut cart)?;
        self.apply_shipping(&mut cart)?;
        let exclusive_shipping_tax = self.calculate_taxes(&mut cart)?;
        self.calculate_totals(&mut cart, exclusive_shipping_tax)?;
        cart.needs_recalculation = false;
        Ok(cart)
    }

    /// Stage 1: zero every derived field, guarding against partial
    /// stale state.
    fn reset_totals(&self, cart: &mut Cart) {
        let currency = cart.currency;
        cart.totals = Totals::zero(currency);
        for item in &mut cart.items {
            item.unit_price = Money::zero(currency);
            item.sub_total = Money::zero(currency);
            item.discount_amount = Money::zero(currency);
            item.tax_breakdown.clear();
            item.tax_total = Money::zero(currency);
            item.total = Money::zero(currency);
        }
    }

    /// Stage 2: resolve unit prices and line subtotals.
    fn calculate_line_items(&self, cart: &mut Cart) -> Result<(), CommerceError> {
        let mut prices = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let price = match self.price_override {
                Some(hook) => hook(cart, item),
                None => {
                    let product = self
                        .products
                        .find(&item.product_id)
                        .ok_or_else(|| CommerceError::ProductNotFound(item.product_id.clone()))?;
                    product.unit_price_for(item.variant.as_ref())?
                }
            };
            prices.push(price);
        }

        for (item, price) in cart.items.iter_mut().zip(prices) {
            item.unit_price = price;
            item.sub_total = price.multiply(item.quantity)?;
            item.total = item.sub_total;
        }
        Ok(())
    }

    /// Stage 3: compute and allocate the coupon discount.
    ///
    /// An attached coupon that no longer validates contributes zero
    /// discount; invalidity is a checkout-time error, not a pricing
    /// one.
    fn apply_coupon_discounts(&self, cart: &mut Cart) -> Result<(), CommerceError> {
        let Some(code) = cart.coupon_code.clone() else {
            return Ok(());
        };
        let Some(coupon) = self.coupons.find_by_code(&code) else {
            tracing::debug!(%code, "coupon attached to cart no longer exists");
            return Ok(());
        };

        // Pre-validate against line subtotals; totals are not final yet.
        let mut subtotal = Money::zero(cart.currency);
        for item in &cart.items {
            subtotal = subtotal.add(&item.sub_total)?;
        }
        cart.totals.sub_total = subtotal;

        if let Err(reason) = CouponEngine::validate(&coupon, cart, 0) {
            tracing::debug!(%code, %reason, "attached coupon skipped during calculation");
            return Ok(());
        }

        let eligible = CouponEngine::eligible_indices(&coupon, cart);
        let weights: Vec<i64> = eligible
            .iter()
            .filter_map(|index| cart.items.get(*index))
            .map(|item| item.sub_total.amount)
            .collect();
        if weights.iter().sum::<i64>() <= 0 {
            return Ok(());
        }

        let discount = CouponEngine::discount_for(&coupon, cart)?;
        if discount.is_zero() {
            return Ok(());
        }

        let shares = discount.allocate(&weights)?;
        for (index, share) in eligible.iter().zip(shares) {
            if let Some(item) = cart.items.get_mut(*index) {
                item.discount_amount = share;
                item.total = item.total.subtract(&share)?;
            }
        }
        cart.totals.discount_total = discount;
        Ok(())
    }

    /// Stage 4: resolve the shipping cost for the selected method.
    fn apply_shipping(&self, cart: &mut Cart) -> Result<(), CommerceError> {
        let Some(method_id) = cart.shipping_method.clone() else {
            return Ok(());
        };
        cart.totals.shipping_total = self.shipping.cost_for(&method_id, cart)?;
        Ok(())
    }

    /// Stage 5: per-line tax breakdowns, plus shipping tax when
    /// configured. Returns the exclusive portion of the shipping tax,
    /// which the totals stage adds to the grand total.
    fn calculate_taxes(&self, cart: &mut Cart) -> Result<Money, CommerceError> {
        let mut exclusive_shipping_tax = Money::zero(cart.currency);
        let Some(address) = self.taxable_address(cart)? else {
            tracing::debug!(cart_id = %cart.id, "no taxable address, skipping taxes");
            return Ok(exclusive_shipping_tax);
        };
        let engine = TaxEngine::new(self.zones, self.rates);

        let mut tax_total = Money::zero(cart.currency);
        let mut rates = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self
                .products
                .find(&item.product_id)
                .ok_or_else(|| CommerceError::ProductNotFound(item.product_id.clone()))?;
            let rate = match &product.tax_category {
                Some(category) => self.rate_or_policy(&engine, category, &address)?,
                None => None,
            };
            rates.push(rate);
        }

        for (item, rate) in cart.items.iter_mut().zip(rates) {
            let Some(rate) = rate else { continue };
            let inclusive = rate.inclusive || self.config.price_includes_tax;
            let amount = if inclusive {
                item.total.inclusive_portion(rate.rate)?
            } else {
                let amount = item.total.percentage(rate.rate)?;
                item.total = item.total.add(&amount)?;
                amount
            };
            item.tax_breakdown.push(TaxLine {
                rate: rate.rate,
                amount,
                inclusive,
            });
            item.tax_total = amount;
            tax_total = tax_total.add(&amount)?;
        }

        if let Some(category) = &self.config.shipping_tax_category {
            if cart.totals.shipping_total.is_positive() {
                if let Some(rate) = self.rate_or_policy(&engine, category, &address)? {
                    let inclusive = rate.inclusive || self.config.price_includes_tax;
                    let amount = if inclusive {
                        cart.totals.shipping_total.inclusive_portion(rate.rate)?
                    } else {
                        let amount = cart.totals.shipping_total.percentage(rate.rate)?;
                        exclusive_shipping_tax = amount;
                        amount
                    };
                    tax_total = tax_total.add(&amount)?;
                }
            }
        }

        cart.totals.tax_total = tax_total;
        Ok(exclusive_shipping_tax)
    }

    /// Stage 6: roll line items up into cart totals.
    fn calculate_totals(
        &self,
        cart: &mut Cart,
        exclusive_shipping_tax: Money,
    ) -> Result<(), CommerceError> {
        cart.totals.sub_total =
            Money::sum(cart.items.iter().map(|i| &i.sub_total), cart.currency)?;

        let mut grand_total = Money::sum(cart.items.iter().map(|i| &i.total), cart.currency)?;
        grand_total = grand_total.add(&cart.totals.shipping_total)?;
        grand_total = grand_total.add(&exclusive_shipping_tax)?;
        cart.totals.grand_total = grand_total;
        Ok(())
    }

    /// The address taxes apply to, per the configured source and
    /// fallback policy.
    fn taxable_address(&self, cart: &Cart) -> Result<Option<Address>, CommerceError> {
        match cart.taxable_address(self.config.tax_address) {
            Some(address) => Ok(Some(address.clone())),
            None => match self.config.no_address {
                NoAddressBehaviour::DefaultAddress => Ok(self.config.default_address.clone()),
                NoAddressBehaviour::PreventCheckout => Err(CommerceError::PreventCheckout(
                    "no taxable address available".to_string(),
                )),
            },
        }
    }

    /// Resolve a rate, applying the configured no-rate policy.
    fn rate_or_policy(
        &self,
        engine: &TaxEngine<'_>,
        category: &crate::ids::TaxCategoryId,
        address: &Address,
    ) -> Result<Option<TaxRate>, CommerceError> {
        if let Some(rate) = engine.resolve_rate(category, address) {
            return Ok(Some(rate));
        }
        match self.config.no_rate {
            NoRateBehaviour::DefaultRate => Ok(self
                .config
                .default_tax_rate
                .as_ref()
                .and_then(|id| self.rates.find(id))),
            NoRateBehaviour::NoTax => Ok(None),
            NoRateBehaviour::PreventCheckout => Err(CommerceError::PreventCheckout(format!(
                "no tax rate available for category {category}"
            ))),
        }
    }
}
