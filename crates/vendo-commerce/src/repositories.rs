//! Repository interfaces the commerce core depends on.
//!
//! The core only ever talks to these traits; backends (in-memory, flat
//! file, database) are interchangeable implementations selected by the
//! embedding application's configuration.

use crate::cart::Cart;
use crate::catalog::Product;
use crate::cart::Coupon;
use crate::checkout::order::Order;
use crate::customers::Customer;
use crate::error::CommerceError;
use crate::ids::{CartId, CustomerId, OrderId, ProductId, TaxCategoryId, TaxRateId, TaxZoneId, VariantKey};
use crate::tax::{TaxRate, TaxZone};

/// Product lookup and stock mutation.
pub trait ProductRepository {
    /// Find a product by id.
    fn find(&self, id: &ProductId) -> Option<Product>;

    /// Persist a product.
    fn save(&self, product: &Product) -> Result<(), CommerceError>;

    /// Atomically decrement stock for a product or variant.
    ///
    /// This is a single read-modify-write against the backing store and
    /// must refuse to drive stock negative, returning
    /// [`CommerceError::InsufficientStock`] instead. Returns the
    /// remaining stock, or `None` when the purchasable is untracked.
    fn decrement_stock(
        &self,
        id: &ProductId,
        variant: Option<&VariantKey>,
        quantity: i64,
    ) -> Result<Option<i64>, CommerceError>;
}

/// Customer lookup and creation.
pub trait CustomerRepository {
    /// Find a customer by id.
    fn find(&self, id: &CustomerId) -> Option<Customer>;

    /// Find a customer by email.
    fn find_by_email(&self, email: &str) -> Option<Customer>;

    /// Create a new customer.
    fn create(&self, name: &str, email: &str) -> Result<Customer, CommerceError>;

    /// Persist a customer.
    fn save(&self, customer: &Customer) -> Result<(), CommerceError>;
}

/// Coupon lookup and redemption.
pub trait CouponRepository {
    /// Find a coupon by its case-normalized code.
    fn find_by_code(&self, code: &str) -> Option<Coupon>;

    /// Persist a coupon.
    fn save(&self, coupon: &Coupon) -> Result<(), CommerceError>;

    /// Atomically increment the redemption counter.
    ///
    /// Must never push the counter past `maximum_uses`; returns
    /// [`CommerceError::CouponExhausted`] instead. Returns the new
    /// redemption count.
    fn redeem(&self, code: &str) -> Result<i64, CommerceError>;
}

/// Cart persistence.
pub trait CartRepository {
    /// Find a cart by id.
    fn find(&self, id: &CartId) -> Option<Cart>;

    /// Persist a cart.
    fn save(&self, cart: &Cart) -> Result<(), CommerceError>;

    /// Delete a cart.
    fn delete(&self, id: &CartId) -> Result<(), CommerceError>;

    /// Delete carts not updated since the cutoff timestamp. Returns the
    /// number of carts removed.
    fn purge_abandoned(&self, cutoff: i64) -> Result<usize, CommerceError>;
}

/// Order persistence and numbering.
pub trait OrderRepository {
    /// Find an order by id.
    fn find(&self, id: &OrderId) -> Option<Order>;

    /// Persist an order, assigning an order number on first save.
    ///
    /// Order numbers are sequential and strictly increasing; gaps are
    /// permitted but numbers are never reassigned or reused.
    fn save(&self, order: &mut Order) -> Result<(), CommerceError>;

    /// How many completed orders by this customer used the coupon code.
    fn coupon_use_count(&self, customer: &CustomerId, code: &str) -> i64;
}

/// Tax zone lookup.
pub trait TaxZoneRepository {
    /// All zones, in configured order.
    fn all(&self) -> Vec<TaxZone>;

    /// Find a zone by id.
    fn find(&self, id: &TaxZoneId) -> Option<TaxZone>;
}

/// Tax rate lookup.
pub trait TaxRateRepository {
    /// Find a rate by id.
    fn find(&self, id: &TaxRateId) -> Option<TaxRate>;

    /// Rates for a (zone, category) pair, in configured order.
    fn for_zone_and_category(&self, zone: &TaxZoneId, category: &TaxCategoryId) -> Vec<TaxRate>;
}
