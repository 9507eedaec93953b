//! Shipping methods and cost resolution.

use crate::cart::Cart;
use crate::address::Address;
use crate::error::CommerceError;
use crate::ids::ShippingMethodId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A way of getting an order to its destination.
pub trait ShippingMethod {
    /// Display name.
    fn name(&self) -> &str;

    /// Cost of shipping the given cart.
    fn calculate_cost(&self, cart: &Cart) -> Result<Money, CommerceError>;

    /// Whether the method can deliver to the address.
    fn is_available(&self, address: &Address) -> bool {
        let _ = address;
        true
    }
}

/// A shipping method offered to a cart, with its computed cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingOption {
    /// Method identifier.
    pub method_id: ShippingMethodId,
    /// Method name.
    pub name: String,
    /// Computed cost for the cart.
    pub cost: Money,
}

/// Registry of shipping methods; computes costs for carts.
pub struct ShippingResolver {
    methods: Vec<(ShippingMethodId, Box<dyn ShippingMethod>)>,
}

impl Default for ShippingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShippingResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Register a shipping method under an id.
    pub fn register(
        mut self,
        id: impl Into<ShippingMethodId>,
        method: impl ShippingMethod + 'static,
    ) -> Self {
        self.methods.push((id.into(), Box::new(method)));
        self
    }

    /// The methods available to a cart, with computed costs. Methods
    /// that refuse the shipping address are filtered out.
    pub fn options_for(&self, cart: &Cart) -> Result<Vec<ShippingOption>, CommerceError> {
        let mut options = Vec::new();
        for (id, method) in &self.methods {
            if let Some(address) = &cart.shipping_address {
                if !method.is_available(address) {
                    continue;
                }
            }
            options.push(ShippingOption {
                method_id: id.clone(),
                name: method.name().to_string(),
                cost: method.calculate_cost(cart)?,
            });
        }
        Ok(options)
    }

    /// Cost of shipping the cart with a specific method.
    pub fn cost_for(
        &self,
        method_id: &ShippingMethodId,
        cart: &Cart,
    ) -> Result<Money, CommerceError> {
        let (_, method) = self
            .methods
            .iter()
            .find(|(id, _)| id == method_id)
            .ok_or_else(|| CommerceError::ShippingMethodNotFound(method_id.clone()))?;

        if let Some(address) = &cart.shipping_address {
            if !method.is_available(address) {
                return Err(CommerceError::ShippingUnavailable(method_id.clone()));
            }
        }

        method.calculate_cost(cart)
    }
}

/// Fixed-cost shipping, available everywhere.
#[derive(Debug, Clone)]
pub struct FlatRate {
    /// Display name.
    pub name: String,
    /// Fixed cost.
    pub cost: Money,
}

impl FlatRate {
    /// Create a flat-rate method.
    pub fn new(name: impl Into<String>, cost: Money) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

impl ShippingMethod for FlatRate {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate_cost(&self, _cart: &Cart) -> Result<Money, CommerceError> {
        Ok(self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    struct DomesticOnly;

    impl ShippingMethod for DomesticOnly {
        fn name(&self) -> &str {
            "Domestic Post"
        }

        fn calculate_cost(&self, cart: &Cart) -> Result<Money, CommerceError> {
            Ok(Money::new(120, cart.currency))
        }

        fn is_available(&self, address: &Address) -> bool {
            address.country_code == "GB"
        }
    }

    fn resolver() -> ShippingResolver {
        ShippingResolver::new()
            .register(
                "flat",
                FlatRate::new("Flat Rate", Money::new(500, Currency::GBP)),
            )
            .register("domestic", DomesticOnly)
    }

    #[test]
    fn test_cost_for_method() {
        let cart = Cart::new(Currency::GBP);
        let cost = resolver()
            .cost_for(&ShippingMethodId::new("flat"), &cart)
            .unwrap();
        assert_eq!(cost.amount, 500);
    }

    #[test]
    fn test_unknown_method() {
        let cart = Cart::new(Currency::GBP);
        assert!(matches!(
            resolver().cost_for(&ShippingMethodId::new("drone"), &cart),
            Err(CommerceError::ShippingMethodNotFound(_))
        ));
    }

    #[test]
    fn test_availability_filtering() {
        let mut cart = Cart::new(Currency::GBP);
        cart.set_shipping_address(Address::new("A", "1 Street", "Berlin", "10115", "DE"));

        let options = resolver().options_for(&cart).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name, "Flat Rate");

        assert!(matches!(
            resolver().cost_for(&ShippingMethodId::new("domestic"), &cart),
            Err(CommerceError::ShippingUnavailable(_))
        ));
    }

    #[test]
    fn test_options_include_costs() {
        let mut cart = Cart::new(Currency::GBP);
        cart.set_shipping_address(Address::new("A", "1 Street", "London", "E1 1AA", "GB"));

        let options = resolver().options_for(&cart).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].cost.amount, 120);
    }
}
