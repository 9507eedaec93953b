//! In-memory repository implementations.
//!
//! Every store is a `Mutex`-protected map. Stock decrements and coupon
//! redemptions take the lock once and do the check-and-write inside it,
//! which gives the compare-and-swap semantics the commerce core
//! requires of concurrent checkouts.

use crate::order_numbers::next_order_number;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use vendo_commerce::cart::{Cart, Coupon};
use vendo_commerce::catalog::Product;
use vendo_commerce::checkout::Order;
use vendo_commerce::customers::Customer;
use vendo_commerce::error::CommerceError;
use vendo_commerce::ids::{
    CartId, CustomerId, OrderId, ProductId, TaxCategoryId, TaxRateId, TaxZoneId, VariantKey,
};
use vendo_commerce::repositories::{
    CartRepository, CouponRepository, CustomerRepository, OrderRepository, ProductRepository,
    TaxRateRepository, TaxZoneRepository,
};
use vendo_commerce::tax::{TaxRate, TaxZone};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory product store with atomic stock decrements.
#[derive(Debug, Default)]
pub struct MemoryProductRepository {
    inner: Mutex<HashMap<ProductId, Product>>,
}

impl MemoryProductRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product, returning its id.
    pub fn insert(&self, product: Product) -> ProductId {
        let id = product.id.clone();
        lock(&self.inner).insert(id.clone(), product);
        id
    }
}

impl ProductRepository for MemoryProductRepository {
    fn find(&self, id: &ProductId) -> Option<Product> {
        lock(&self.inner).get(id).cloned()
    }

    fn save(&self, product: &Product) -> Result<(), CommerceError> {
        lock(&self.inner).insert(product.id.clone(), product.clone());
        Ok(())
    }

    fn decrement_stock(
        &self,
        id: &ProductId,
        variant: Option<&VariantKey>,
        quantity: i64,
    ) -> Result<Option<i64>, CommerceError> {
        let mut inner = lock(&self.inner);
        let product = inner
            .get_mut(id)
            .ok_or_else(|| CommerceError::ProductNotFound(id.clone()))?;

        let slot = match variant {
            Some(key) => {
                &mut product
                    .variants
                    .iter_mut()
                    .find(|v| &v.key == key)
                    .ok_or_else(|| CommerceError::VariantNotFound {
                        product_id: id.clone(),
                        variant: key.clone(),
                    })?
                    .stock
            }
            None => &mut product.stock,
        };

        match slot {
            None => Ok(None),
            Some(stock) => {
                if *stock - quantity < 0 {
                    return Err(CommerceError::InsufficientStock {
                        product_id: id.clone(),
                        variant: variant.cloned(),
                        requested: quantity,
                        available: *stock,
                    });
                }
                *stock -= quantity;
                Ok(Some(*stock))
            }
        }
    }
}

/// In-memory customer store.
#[derive(Debug, Default)]
pub struct MemoryCustomerRepository {
    inner: Mutex<HashMap<CustomerId, Customer>>,
}

impl MemoryCustomerRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomerRepository for MemoryCustomerRepository {
    fn find(&self, id: &CustomerId) -> Option<Customer> {
        lock(&self.inner).get(id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<Customer> {
        lock(&self.inner)
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn create(&self, name: &str, email: &str) -> Result<Customer, CommerceError> {
        let customer = Customer::new(name, email);
        lock(&self.inner).insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    fn save(&self, customer: &Customer) -> Result<(), CommerceError> {
        lock(&self.inner).insert(customer.id.clone(), customer.clone());
        Ok(())
    }
}

/// In-memory coupon store with atomic redemption.
#[derive(Debug, Default)]
pub struct MemoryCouponRepository {
    inner: Mutex<HashMap<String, Coupon>>,
}

impl MemoryCouponRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coupon, keyed by its normalized code.
    pub fn insert(&self, coupon: Coupon) {
        lock(&self.inner).insert(coupon.code.clone(), coupon);
    }
}

impl CouponRepository for MemoryCouponRepository {
    fn find_by_code(&self, code: &str) -> Option<Coupon> {
        lock(&self.inner)
            .get(&Coupon::normalize_code(code))
            .cloned()
    }

    fn save(&self, coupon: &Coupon) -> Result<(), CommerceError> {
        lock(&self.inner).insert(coupon.code.clone(), coupon.clone());
        Ok(())
    }

    fn redeem(&self, code: &str) -> Result<i64, CommerceError> {
        let mut inner = lock(&self.inner);
        let coupon = inner
            .get_mut(&Coupon::normalize_code(code))
            .ok_or_else(|| CommerceError::CouponNotFound(code.to_string()))?;
        if coupon.is_exhausted() {
            return Err(CommerceError::CouponExhausted(coupon.code.clone()));
        }
        coupon.redeemed += 1;
        Ok(coupon.redeemed)
    }
}

/// In-memory cart store.
#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    inner: Mutex<HashMap<CartId, Cart>>,
}

impl MemoryCartRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartRepository for MemoryCartRepository {
    fn find(&self, id: &CartId) -> Option<Cart> {
        lock(&self.inner).get(id).cloned()
    }

    fn save(&self, cart: &Cart) -> Result<(), CommerceError> {
        lock(&self.inner).insert(cart.id.clone(), cart.clone());
        Ok(())
    }

    fn delete(&self, id: &CartId) -> Result<(), CommerceError> {
        lock(&self.inner).remove(id);
        Ok(())
    }

    fn purge_abandoned(&self, cutoff: i64) -> Result<usize, CommerceError> {
        let mut inner = lock(&self.inner);
        let before = inner.len();
        inner.retain(|_, cart| cart.updated_at >= cutoff);
        let purged = before - inner.len();
        if purged > 0 {
            tracing::debug!(purged, "purged abandoned carts");
        }
        Ok(purged)
    }
}

/// In-memory order store with sequential numbering.
#[derive(Debug)]
pub struct MemoryOrderRepository {
    inner: Mutex<HashMap<OrderId, Order>>,
    /// High-water mark: numbers below this are never reissued, even if
    /// the order that held one was deleted.
    last_issued: Mutex<Option<u64>>,
    minimum_order_number: u64,
}

impl MemoryOrderRepository {
    /// Create an empty store.
    pub fn new(minimum_order_number: u64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            last_issued: Mutex::new(None),
            minimum_order_number,
        }
    }

    /// Insert an order as-is, without assigning a number. Used to seed
    /// legacy records.
    pub fn insert_raw(&self, order: Order) {
        lock(&self.inner).insert(order.id.clone(), order);
    }

    /// All orders on record.
    pub fn all(&self) -> Vec<Order> {
        lock(&self.inner).values().cloned().collect()
    }
}

impl OrderRepository for MemoryOrderRepository {
    fn find(&self, id: &OrderId) -> Option<Order> {
        lock(&self.inner).get(id).cloned()
    }

    fn save(&self, order: &mut Order) -> Result<(), CommerceError> {
        let mut inner = lock(&self.inner);
        if order.order_number().is_none() {
            let mut last_issued = lock(&self.last_issued);
            let candidate = next_order_number(inner.values(), self.minimum_order_number);
            let number = match *last_issued {
                Some(last) => candidate.max(last + 1),
                None => candidate,
            };
            order.assign_order_number(number)?;
            *last_issued = Some(number);
        }
        inner.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn coupon_use_count(&self, customer: &CustomerId, code: &str) -> i64 {
        lock(&self.inner)
            .values()
            .filter(|o| {
                o.customer.as_ref() == Some(customer) && o.coupon_code.as_deref() == Some(code)
            })
            .count() as i64
    }
}

/// In-memory tax zone store. Zone order is configuration order.
#[derive(Debug, Default)]
pub struct MemoryTaxZoneRepository {
    inner: Mutex<Vec<TaxZone>>,
}

impl MemoryTaxZoneRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over the given zones.
    pub fn with_zones(zones: Vec<TaxZone>) -> Self {
        Self {
            inner: Mutex::new(zones),
        }
    }

    /// Append a zone.
    pub fn insert(&self, zone: TaxZone) {
        lock(&self.inner).push(zone);
    }
}

impl TaxZoneRepository for MemoryTaxZoneRepository {
    fn all(&self) -> Vec<TaxZone> {
        lock(&self.inner).clone()
    }

    fn find(&self, id: &TaxZoneId) -> Option<TaxZone> {
        lock(&self.inner).iter().find(|z| &z.id == id).cloned()
    }
}

/// In-memory tax rate store. Rate order is configuration order.
#[derive(Debug, Default)]
pub struct MemoryTaxRateRepository {
    inner: Mutex<Vec<TaxRate>>,
}

impl MemoryTaxRateRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over the given rates.
    pub fn with_rates(rates: Vec<TaxRate>) -> Self {
        Self {
            inner: Mutex::new(rates),
        }
    }

    /// Append a rate.
    pub fn insert(&self, rate: TaxRate) {
        lock(&self.inner).push(rate);
    }
}

impl TaxRateRepository for MemoryTaxRateRepository {
    fn find(&self, id: &TaxRateId) -> Option<TaxRate> {
        lock(&self.inner).iter().find(|r| &r.id == id).cloned()
    }

    fn for_zone_and_category(&self, zone: &TaxZoneId, category: &TaxCategoryId) -> Vec<TaxRate> {
        lock(&self.inner)
            .iter()
            .filter(|r| &r.zone == zone && &r.category == category)
            .cloned()
            .collect()
    }
}
