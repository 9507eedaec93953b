//! Repository backends for Vendo.
//!
//! Two interchangeable implementations of the `vendo-commerce`
//! repository traits, selected by configuration:
//!
//! - [`memory`]: `Mutex`-protected maps; stock decrements and coupon
//!   redemptions are single-lock read-modify-write sections.
//! - [`json_file`]: one JSON document per cart/order in a directory,
//!   written atomically via a temp-file rename.
//!
//! # Example
//!
//! ```rust
//! use vendo_store::{cart_repository, order_repository, StoreBackend};
//!
//! let backend = StoreBackend::Memory;
//! let carts = cart_repository(&backend).unwrap();
//! let orders = order_repository(&backend, 1000).unwrap();
//! ```

mod error;
pub mod json_file;
pub mod memory;
pub mod order_numbers;

pub use error::StoreError;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vendo_commerce::repositories::{CartRepository, OrderRepository};
use vendo_commerce::CommerceError;

/// Which backend carts and orders persist to.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local maps; contents die with the process.
    #[default]
    Memory,
    /// One JSON document per record under `dir`.
    JsonFile {
        /// Directory holding the documents.
        dir: PathBuf,
    },
}

/// Build a cart repository for the configured backend.
pub fn cart_repository(
    backend: &StoreBackend,
) -> Result<Box<dyn CartRepository>, CommerceError> {
    match backend {
        StoreBackend::Memory => Ok(Box::new(memory::MemoryCartRepository::new())),
        StoreBackend::JsonFile { dir } => Ok(Box::new(json_file::JsonFileCartRepository::new(
            dir.join("carts"),
        )?)),
    }
}

/// Build an order repository for the configured backend.
pub fn order_repository(
    backend: &StoreBackend,
    minimum_order_number: u64,
) -> Result<Box<dyn OrderRepository>, CommerceError> {
    match backend {
        StoreBackend::Memory => Ok(Box::new(memory::MemoryOrderRepository::new(
            minimum_order_number,
        ))),
        StoreBackend::JsonFile { dir } => Ok(Box::new(json_file::JsonFileOrderRepository::new(
            dir.join("orders"),
            minimum_order_number,
        )?)),
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::json_file::{JsonFileCartRepository, JsonFileOrderRepository};
    pub use crate::memory::{
        MemoryCartRepository, MemoryCouponRepository, MemoryCustomerRepository,
        MemoryOrderRepository, MemoryProductRepository, MemoryTaxRateRepository,
        MemoryTaxZoneRepository,
    };
    pub use crate::{cart_repository, order_repository, StoreBackend, StoreError};
}
