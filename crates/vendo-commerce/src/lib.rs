//! Commerce domain core for Vendo.
//!
//! This crate provides the calculation and checkout engine for a
//! commerce application:
//!
//! - **Money**: integer minor-unit arithmetic, allocation, formatting
//! - **Catalog**: products, variants, the stock ledger
//! - **Cart**: line items, coupons, derived totals
//! - **Tax**: zones, categories, rates, deterministic resolution
//! - **Checkout**: the six-stage calculation pipeline, the order state
//!   machine, payment gateways, and the checkout orchestrator
//!
//! Persistence is behind the repository traits in [`repositories`];
//! see the `vendo-store` crate for interchangeable backends.
//!
//! # Example
//!
//! ```rust
//! use vendo_commerce::prelude::*;
//!
//! let mut cart = Cart::new(Currency::GBP);
//! cart.add_item(ProductId::new("cat-food"), None, 2).unwrap();
//! cart.apply_coupon("SAVE10");
//!
//! assert_eq!(cart.item_count(), 2);
//! assert!(cart.needs_recalculation);
//! ```

pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod customers;
pub mod error;
pub mod events;
pub mod ids;
pub mod money;
pub mod repositories;
pub mod shipping;
pub mod tax;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Configuration
    pub use crate::config::{
        CommerceConfig, NoAddressBehaviour, NoRateBehaviour, TaxAddressSource,
    };

    // Catalog
    pub use crate::catalog::{Product, ProductType, ProductVariant, StockLedger, StockState};

    // Cart
    pub use crate::address::Address;
    pub use crate::cart::{Cart, Coupon, CouponEngine, CouponValue, LineItem, TaxLine, Totals};

    // Tax
    pub use crate::tax::{TaxCategory, TaxEngine, TaxRate, TaxZone};

    // Shipping
    pub use crate::shipping::{FlatRate, ShippingMethod, ShippingOption, ShippingResolver};

    // Checkout
    pub use crate::checkout::{
        Calculator, CheckoutOrchestrator, CheckoutOutcome, CheckoutRequest, GatewayRegistry,
        GatewayResponse, OfflineGateway, Order, OrderStatus, PaymentGateway, PaymentStatus,
        RefundResult, StatusLogEntry, StatusTransition,
    };

    // Customers & events
    pub use crate::customers::Customer;
    pub use crate::events::{CommerceEvent, LogNotifier, Notifier};

    // Repositories
    pub use crate::repositories::{
        CartRepository, CouponRepository, CustomerRepository, OrderRepository, ProductRepository,
        TaxRateRepository, TaxZoneRepository,
    };
}
