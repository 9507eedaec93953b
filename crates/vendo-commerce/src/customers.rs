//! Customer records.

use crate::ids::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A customer, resolved or created by email at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    /// Unique customer identifier.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Email address (unique per customer).
    pub email: String,
    /// Completed orders, in placement order.
    pub orders: Vec<OrderId>,
    /// Additional metadata, passed through unmodified.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Customer {
    /// Create a new customer.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: CustomerId::generate(),
            name: name.into(),
            email: email.into(),
            orders: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Record a completed order.
    pub fn add_order(&mut self, order: OrderId) {
        if !self.orders.contains(&order) {
            self.orders.push(order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_order_deduplicates() {
        let mut customer = Customer::new("Joan", "joan@example.com");
        let order = OrderId::new("order-1");
        customer.add_order(order.clone());
        customer.add_order(order);
        assert_eq!(customer.orders.len(), 1);
    }
}
