//! Flat-file repository implementations.
//!
//! One JSON document per record, named `<id>.json`, written via a
//! temp-file rename so readers never observe a half-written document.

use crate::error::StoreError;
use crate::order_numbers::next_order_number;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use vendo_commerce::cart::Cart;
use vendo_commerce::checkout::Order;
use vendo_commerce::error::CommerceError;
use vendo_commerce::ids::{CartId, CustomerId, OrderId};
use vendo_commerce::repositories::{CartRepository, OrderRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_document(dir: &Path, id: &str, json: &[u8]) -> Result<(), StoreError> {
    let tmp = dir.join(format!("{id}.json.tmp"));
    let path = dir.join(format!("{id}.json"));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

fn read_documents<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let contents = fs::read(&path)?;
        records.push(serde_json::from_slice(&contents)?);
    }
    Ok(records)
}

/// Cart store backed by a directory of JSON documents.
#[derive(Debug)]
pub struct JsonFileCartRepository {
    dir: PathBuf,
}

impl JsonFileCartRepository {
    /// Create a store under the given directory, creating it if
    /// needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CommerceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::from)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &CartId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl CartRepository for JsonFileCartRepository {
    fn find(&self, id: &CartId) -> Option<Cart> {
        let contents = fs::read(self.path_for(id)).ok()?;
        serde_json::from_slice(&contents).ok()
    }

    fn save(&self, cart: &Cart) -> Result<(), CommerceError> {
        let json = serde_json::to_vec_pretty(cart).map_err(StoreError::from)?;
        write_document(&self.dir, cart.id.as_str(), &json)?;
        Ok(())
    }

    fn delete(&self, id: &CartId) -> Result<(), CommerceError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    fn purge_abandoned(&self, cutoff: i64) -> Result<usize, CommerceError> {
        let carts: Vec<Cart> = read_documents(&self.dir).map_err(CommerceError::from)?;
        let mut purged = 0;
        for cart in carts {
            if cart.updated_at < cutoff {
                self.delete(&cart.id)?;
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::debug!(purged, "purged abandoned carts");
        }
        Ok(purged)
    }
}

/// Order store backed by a directory of JSON documents.
#[derive(Debug)]
pub struct JsonFileOrderRepository {
    dir: PathBuf,
    /// High-water mark for numbers issued by this process; numbers are
    /// never reissued even if the order holding one was deleted.
    last_issued: Mutex<Option<u64>>,
    minimum_order_number: u64,
}

impl JsonFileOrderRepository {
    /// Create a store under the given directory, creating it if
    /// needed.
    pub fn new(dir: impl Into<PathBuf>, minimum_order_number: u64) -> Result<Self, CommerceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(StoreError::from)?;
        Ok(Self {
            dir,
            last_issued: Mutex::new(None),
            minimum_order_number,
        })
    }

    fn path_for(&self, id: &OrderId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// All orders on record.
    pub fn all(&self) -> Result<Vec<Order>, CommerceError> {
        read_documents(&self.dir).map_err(CommerceError::from)
    }
}

impl OrderRepository for JsonFileOrderRepository {
    fn find(&self, id: &OrderId) -> Option<Order> {
        let contents = fs::read(self.path_for(id)).ok()?;
        serde_json::from_slice(&contents).ok()
    }

    fn save(&self, order: &mut Order) -> Result<(), CommerceError> {
        if order.order_number().is_none() {
            let mut last_issued = lock(&self.last_issued);
            let existing = self.all()?;
            let candidate = next_order_number(existing.iter(), self.minimum_order_number);
            let number = match *last_issued {
                Some(last) => candidate.max(last + 1),
                None => candidate,
            };
            order.assign_order_number(number)?;
            *last_issued = Some(number);
        }

        let json = serde_json::to_vec_pretty(order).map_err(StoreError::from)?;
        write_document(&self.dir, order.id.as_str(), &json)?;
        Ok(())
    }

    fn coupon_use_count(&self, customer: &CustomerId, code: &str) -> i64 {
        self.all()
            .map(|orders| {
                orders
                    .iter()
                    .filter(|o| {
                        o.customer.as_ref() == Some(customer)
                            && o.coupon_code.as_deref() == Some(code)
                    })
                    .count() as i64
            })
            .unwrap_or(0)
    }
}
