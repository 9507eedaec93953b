//! Product catalog: products, variants, and the stock ledger.

pub mod product;
pub mod stock;

pub use product::{Product, ProductType, ProductVariant};
pub use stock::{StockCheck, StockLedger, StockState};
