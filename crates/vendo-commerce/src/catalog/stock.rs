//! The stock ledger: checkout-time stock validation and commitment.
//!
//! Each line item moves through `Unchecked -> Validated -> Committed`,
//! or `Unchecked -> Rejected`. Validation is read-only and covers every
//! line item before any stock mutates, so a checkout either proceeds
//! wholly or fails without touching stock. Commit decrements through
//! the repository's atomic read-modify-write; losing the race between
//! validation and commit is fatal to the attempt, never oversold.

use crate::cart::Cart;
use crate::error::CommerceError;
use crate::events::{CommerceEvent, Notifier};
use crate::ids::{LineItemId, ProductId, VariantKey};
use crate::repositories::ProductRepository;
use serde::{Deserialize, Serialize};

/// Per-line-item stock state during checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StockState {
    /// Not yet examined.
    #[default]
    Unchecked,
    /// Stock covers the requested quantity.
    Validated,
    /// Stock has been decremented.
    Committed,
    /// Stock cannot cover the requested quantity.
    Rejected,
}

/// The outcome of checking one line item against stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCheck {
    /// The line item examined.
    pub line_item_id: LineItemId,
    /// Product purchased.
    pub product_id: ProductId,
    /// Variant, for variable products.
    pub variant: Option<VariantKey>,
    /// Resulting state.
    pub state: StockState,
}

/// Validates and commits purchasable stock during checkout.
pub struct StockLedger<'a> {
    products: &'a dyn ProductRepository,
    notifier: &'a dyn Notifier,
    low_stock_threshold: i64,
}

impl<'a> StockLedger<'a> {
    /// Create a ledger over a product repository.
    pub fn new(
        products: &'a dyn ProductRepository,
        notifier: &'a dyn Notifier,
        low_stock_threshold: i64,
    ) -> Self {
        Self {
            products,
            notifier,
            low_stock_threshold,
        }
    }

    /// Validate every line item against current stock, read-only.
    ///
    /// Returns [`CommerceError::InsufficientStock`] naming the first
    /// offending line item; no stock has been mutated at that point, so
    /// the caller can remove the item and retry.
    pub fn validate(&self, cart: &Cart) -> Result<Vec<StockCheck>, CommerceError> {
        let mut checks = Vec::with_capacity(cart.items.len());

        for item in &cart.items {
            let product = self
                .products
                .find(&item.product_id)
                .ok_or_else(|| CommerceError::ProductNotFound(item.product_id.clone()))?;

            if let Some(stock) = product.stock_for(item.variant.as_ref())? {
                if stock - item.quantity < 0 {
                    checks.push(StockCheck {
                        line_item_id: item.id.clone(),
                        product_id: item.product_id.clone(),
                        variant: item.variant.clone(),
                        state: StockState::Rejected,
                    });
                    return Err(CommerceError::InsufficientStock {
                        product_id: item.product_id.clone(),
                        variant: item.variant.clone(),
                        requested: item.quantity,
                        available: stock,
                    });
                }
            }

            checks.push(StockCheck {
                line_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                variant: item.variant.clone(),
                state: StockState::Validated,
            });
        }

        Ok(checks)
    }

    /// Decrement stock for every line item.
    ///
    /// Only call after [`StockLedger::validate`] passed. Each decrement
    /// is atomic in the repository; a decrement that would go negative
    /// means a concurrent checkout won the race since validation, and
    /// surfaces as the fatal [`CommerceError::StockRace`]. A resulting
    /// stock of exactly zero succeeds and signals
    /// [`CommerceEvent::StockRunOut`].
    pub fn commit(&self, cart: &Cart) -> Result<Vec<StockCheck>, CommerceError> {
        let mut checks = Vec::with_capacity(cart.items.len());

        for item in &cart.items {
            let remaining = self
                .products
                .decrement_stock(&item.product_id, item.variant.as_ref(), item.quantity)
                .map_err(|e| match e {
                    CommerceError::InsufficientStock {
                        product_id,
                        variant,
                        ..
                    } => CommerceError::StockRace {
                        product_id,
                        variant,
                    },
                    other => other,
                })?;

            if let Some(remaining) = remaining {
                if remaining <= 0 {
                    self.notifier.notify(&CommerceEvent::StockRunOut {
                        product_id: item.product_id.clone(),
                        variant: item.variant.clone(),
                    });
                } else if remaining <= self.low_stock_threshold {
                    self.notifier.notify(&CommerceEvent::StockRunningLow {
                        product_id: item.product_id.clone(),
                        variant: item.variant.clone(),
                        remaining,
                    });
                }
            }

            checks.push(StockCheck {
                line_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                variant: item.variant.clone(),
                state: StockState::Committed,
            });
        }

        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::events::test_support::CapturingNotifier;
    use crate::money::{Currency, Money};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapProducts {
        inner: Mutex<HashMap<ProductId, Product>>,
    }

    impl MapProducts {
        fn with(products: Vec<Product>) -> Self {
            Self {
                inner: Mutex::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            }
        }

        fn stock_of(&self, id: &ProductId) -> Option<i64> {
            self.inner
                .lock()
                .ok()
                .and_then(|map| map.get(id).and_then(|p| p.stock))
        }
    }

    impl ProductRepository for MapProducts {
        fn find(&self, id: &ProductId) -> Option<Product> {
            self.inner.lock().ok().and_then(|map| map.get(id).cloned())
        }

        fn save(&self, product: &Product) -> Result<(), CommerceError> {
            if let Ok(mut map) = self.inner.lock() {
                map.insert(product.id.clone(), product.clone());
            }
            Ok(())
        }

        fn decrement_stock(
            &self,
            id: &ProductId,
            variant: Option<&VariantKey>,
            quantity: i64,
        ) -> Result<Option<i64>, CommerceError> {
            let mut map = self
                .inner
                .lock()
                .map_err(|e| CommerceError::Store(e.to_string()))?;
            let product = map
                .get_mut(id)
                .ok_or_else(|| CommerceError::ProductNotFound(id.clone()))?;

            let stock_slot = match variant {
                Some(key) => {
                    let variant = product
                        .variants
                        .iter_mut()
                        .find(|v| &v.key == key)
                        .ok_or_else(|| CommerceError::VariantNotFound {
                            product_id: id.clone(),
                            variant: key.clone(),
                        })?;
                    &mut variant.stock
                }
                None => &mut product.stock,
            };

            match stock_slot {
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

    fn cart_with(product_id: &ProductId, quantity: i64) -> Cart {
        let mut cart = Cart::new(Currency::GBP);
        cart.add_item(product_id.clone(), None, quantity).unwrap();
        cart
    }

    #[test]
    fn test_validate_passes_with_enough_stock() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(5);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        let checks = ledger.validate(&cart_with(&id, 5)).unwrap();
        assert!(checks.iter().all(|c| c.state == StockState::Validated));
    }

    #[test]
    fn test_validate_rejects_oversell() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(2);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        let err = ledger.validate(&cart_with(&id, 3)).unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        // Read-only: stock untouched
        assert_eq!(products.stock_of(&id), Some(2));
    }

    #[test]
    fn test_untracked_stock_always_validates() {
        let product = Product::new("Download", Money::new(500, Currency::GBP));
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        assert!(ledger.validate(&cart_with(&id, 9000)).is_ok());
    }

    #[test]
    fn test_commit_decrements_stock() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(20);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        let checks = ledger.commit(&cart_with(&id, 3)).unwrap();
        assert!(checks.iter().all(|c| c.state == StockState::Committed));
        assert_eq!(products.stock_of(&id), Some(17));
        assert!(notifier.captured().is_empty());
    }

    #[test]
    fn test_commit_signals_low_stock() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(12);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        ledger.commit(&cart_with(&id, 3)).unwrap();
        assert!(matches!(
            notifier.captured().as_slice(),
            [CommerceEvent::StockRunningLow { remaining: 9, .. }]
        ));
    }

    #[test]
    fn test_commit_to_exactly_zero_succeeds() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(1);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        ledger.commit(&cart_with(&id, 1)).unwrap();
        assert_eq!(products.stock_of(&id), Some(0));
        assert!(matches!(
            notifier.captured().as_slice(),
            [CommerceEvent::StockRunOut { .. }]
        ));
    }

    #[test]
    fn test_commit_race_is_fatal() {
        let mut product = Product::new("Cat Food", Money::new(1000, Currency::GBP));
        product.stock = Some(1);
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 10);

        let cart = cart_with(&id, 1);
        ledger.validate(&cart).unwrap();

        // A concurrent checkout takes the last unit between validation
        // and commit.
        products
            .decrement_stock(&id, None, 1)
            .unwrap();

        let err = ledger.commit(&cart).unwrap_err();
        assert!(matches!(err, CommerceError::StockRace { .. }));
        assert!(!err.is_recoverable());
        assert_eq!(products.stock_of(&id), Some(0));
    }

    #[test]
    fn test_variant_stock_committed() {
        use crate::catalog::ProductVariant;

        let product = Product::new("T-Shirt", Money::new(1500, Currency::GBP)).with_variant(
            ProductVariant::new("large", "Large", Money::new(1800, Currency::GBP)).with_stock(4),
        );
        let id = product.id.clone();
        let products = MapProducts::with(vec![product]);
        let notifier = CapturingNotifier::default();
        let ledger = StockLedger::new(&products, &notifier, 2);

        let mut cart = Cart::new(Currency::GBP);
        cart.add_item(id.clone(), Some(VariantKey::new("large")), 3)
            .unwrap();

        ledger.validate(&cart).unwrap();
        ledger.commit(&cart).unwrap();

        let stored = products.find(&id).unwrap();
        assert_eq!(
            stored.variant(&VariantKey::new("large")).unwrap().stock,
            Some(1)
        );
    }
}
