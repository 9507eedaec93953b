//! Cart and line item types.

use crate::address::Address;
use crate::config::TaxAddressSource;
use crate::error::CommerceError;
use crate::ids::{CartId, CustomerId, LineItemId, ProductId, ShippingMethodId, VariantKey};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// One entry of a line item's tax breakdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxLine {
    /// Integer percentage rate.
    pub rate: i64,
    /// Tax amount at that rate.
    pub amount: Money,
    /// Whether the tax is embedded in the price.
    pub inclusive: bool,
}

/// Derived monetary totals, shared by carts and orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Totals {
    /// Sum of line subtotals, pre-discount and pre-tax.
    pub sub_total: Money,
    /// Total coupon discount.
    pub discount_total: Money,
    /// Total tax, inclusive and exclusive portions combined.
    pub tax_total: Money,
    /// Shipping cost.
    pub shipping_total: Money,
    /// Final total.
    pub grand_total: Money,
}

impl Totals {
    /// All-zero totals in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            sub_total: Money::zero(currency),
            discount_total: Money::zero(currency),
            tax_total: Money::zero(currency),
            shipping_total: Money::zero(currency),
            grand_total: Money::zero(currency),
        }
    }
}

/// A line item in a cart or order.
///
/// Identity is stable from creation; the pricing fields are derived and
/// rewritten by each calculation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Unique line item identifier.
    pub id: LineItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant key, for variable products.
    pub variant: Option<VariantKey>,
    /// Quantity (always positive).
    pub quantity: i64,
    /// Unit price, snapshotted at calculation time.
    pub unit_price: Money,
    /// Subtotal (unit_price * quantity).
    pub sub_total: Money,
    /// Discount allocated to this item.
    pub discount_amount: Money,
    /// Tax breakdown, one entry per applied rate.
    pub tax_breakdown: Vec<TaxLine>,
    /// Total tax on this item.
    pub tax_total: Money,
    /// Running total (subtotal - discount, plus exclusive tax).
    pub total: Money,
    /// Additional metadata, passed through unmodified. Never read by
    /// pricing logic.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LineItem {
    /// Create a new line item with zeroed pricing fields.
    pub fn new(
        product_id: ProductId,
        variant: Option<VariantKey>,
        quantity: i64,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }
        Ok(Self {
            id: LineItemId::generate(),
            product_id,
            variant,
            quantity,
            unit_price: Money::zero(currency),
            sub_total: Money::zero(currency),
            discount_amount: Money::zero(currency),
            tax_breakdown: Vec::new(),
            tax_total: Money::zero(currency),
            total: Money::zero(currency),
            metadata: BTreeMap::new(),
        })
    }
}

/// A shopping cart: a mutable, not-yet-committed order.
///
/// Derived totals are only trustworthy while `needs_recalculation` is
/// false; any mutation flips it back until the calculator runs again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Attached customer, if resolved.
    pub customer: Option<CustomerId>,
    /// Line items, ordered by insertion.
    pub items: Vec<LineItem>,
    /// Applied coupon code (case-normalized).
    pub coupon_code: Option<String>,
    /// Selected shipping method.
    pub shipping_method: Option<ShippingMethodId>,
    /// Billing address.
    pub billing_address: Option<Address>,
    /// Shipping address.
    pub shipping_address: Option<Address>,
    /// Cart currency.
    pub currency: Currency,
    /// Derived totals, as of the last calculation.
    #[serde(flatten)]
    pub totals: Totals,
    /// Additional metadata, passed through unmodified. Never read by
    /// pricing logic.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// True when the cart changed since the last calculation.
    pub needs_recalculation: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Cart {
    /// Create a new empty cart.
    pub fn new(currency: Currency) -> Self {
        let now = current_timestamp();
        Self {
            id: CartId::generate(),
            customer: None,
            items: Vec::new(),
            coupon_code: None,
            shipping_method: None,
            billing_address: None,
            shipping_address: None,
            currency,
            totals: Totals::zero(currency),
            metadata: BTreeMap::new(),
            needs_recalculation: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = current_timestamp();
        self.needs_recalculation = true;
    }

    /// Add an item to the cart.
    ///
    /// Adding the same product/variant again increases the existing
    /// line's quantity. Returns the line item id.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        variant: Option<VariantKey>,
        quantity: i64,
    ) -> Result<LineItemId, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.variant == variant)
        {
            let new_quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;
            if new_quantity > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(
                    new_quantity,
                    MAX_QUANTITY_PER_ITEM,
                ));
            }
            existing.quantity = new_quantity;
            let id = existing.id.clone();
            self.touch();
            return Ok(id);
        }

        let item = LineItem::new(product_id, variant, quantity, self.currency)?;
        let id = item.id.clone();
        self.items.push(item);
        self.touch();
        Ok(id)
    }

    /// Update an item's quantity. A quantity of zero or less removes
    /// the item. Returns whether a matching item was found.
    pub fn update_quantity(
        &mut self,
        line_item_id: &LineItemId,
        quantity: i64,
    ) -> Result<bool, CommerceError> {
        if quantity <= 0 {
            return Ok(self.remove_item(line_item_id));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                quantity,
                MAX_QUANTITY_PER_ITEM,
            ));
        }

        if let Some(item) = self.items.iter_mut().find(|i| &i.id == line_item_id) {
            item.quantity = quantity;
            self.touch();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove an item from the cart.
    pub fn remove_item(&mut self, line_item_id: &LineItemId) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != line_item_id);
        let removed = self.items.len() < len_before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Clear all items and the coupon.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
        self.touch();
    }

    /// Apply a coupon code (case-normalized). Validation happens during
    /// checkout; applying never redeems.
    pub fn apply_coupon(&mut self, code: &str) {
        self.coupon_code = Some(crate::cart::coupon::Coupon::normalize_code(code));
        self.touch();
    }

    /// Remove the applied coupon.
    pub fn remove_coupon(&mut self) -> bool {
        let removed = self.coupon_code.take().is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Attach a customer.
    pub fn set_customer(&mut self, customer: CustomerId) {
        self.customer = Some(customer);
        self.touch();
    }

    /// Set the billing address.
    pub fn set_billing_address(&mut self, address: Address) {
        self.billing_address = Some(address);
        self.touch();
    }

    /// Set the shipping address.
    pub fn set_shipping_address(&mut self, address: Address) {
        self.shipping_address = Some(address);
        self.touch();
    }

    /// Select a shipping method.
    pub fn set_shipping_method(&mut self, method: ShippingMethodId) {
        self.shipping_method = Some(method);
        self.touch();
    }

    /// The address taxes are calculated against, per configuration.
    pub fn taxable_address(&self, source: TaxAddressSource) -> Option<&Address> {
        match source {
            TaxAddressSource::Billing => self.billing_address.as_ref(),
            TaxAddressSource::Shipping => self.shipping_address.as_ref(),
        }
    }

    /// Get an item by ID.
    pub fn get_item(&self, line_item_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
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
