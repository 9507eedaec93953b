//! Product and variant types.

use crate::error::CommerceError;
use crate::ids::{ProductId, TaxCategoryId, VariantKey};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductType {
    /// Simple product with no variants.
    #[default]
    Simple,
    /// Product with purchasable variants.
    Variable,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
        }
    }
}

/// A purchasable product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Base price.
    pub price: Money,
    /// Type of product.
    pub product_type: ProductType,
    /// Tax category for rate resolution.
    pub tax_category: Option<TaxCategoryId>,
    /// Stock count. `None` means stock is not tracked (unlimited).
    pub stock: Option<i64>,
    /// Variants, each with its own price and stock override.
    pub variants: Vec<ProductVariant>,
    /// Additional metadata, passed through unmodified.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Product {
    /// Create a new simple product.
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        Self {
            id: ProductId::generate(),
            name: name.into(),
            price,
            product_type: ProductType::Simple,
            tax_category: None,
            stock: None,
            variants: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the tax category.
    pub fn with_tax_category(mut self, category: TaxCategoryId) -> Self {
        self.tax_category = Some(category);
        self
    }

    /// Set a tracked stock count.
    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Add a variant; the product becomes variable.
    pub fn with_variant(mut self, variant: ProductVariant) -> Self {
        self.product_type = ProductType::Variable;
        self.variants.push(variant);
        self
    }

    /// Look up a variant by key.
    pub fn variant(&self, key: &VariantKey) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.key == key)
    }

    /// Resolve the unit price for a purchase of this product, or one of
    /// its variants.
    pub fn unit_price_for(&self, variant: Option<&VariantKey>) -> Result<Money, CommerceError> {
        match variant {
            Some(key) => {
                let variant = self.variant(key).ok_or_else(|| CommerceError::VariantNotFound {
                    product_id: self.id.clone(),
                    variant: key.clone(),
                })?;
                Ok(variant.price)
            }
            None => Ok(self.price),
        }
    }

    /// Resolve the tracked stock count for this product or one of its
    /// variants. `None` means the purchasable is untracked.
    pub fn stock_for(&self, variant: Option<&VariantKey>) -> Result<Option<i64>, CommerceError> {
        match variant {
            Some(key) => {
                let variant = self.variant(key).ok_or_else(|| CommerceError::VariantNotFound {
                    product_id: self.id.clone(),
                    variant: key.clone(),
                })?;
                Ok(variant.stock)
            }
            None => Ok(self.stock),
        }
    }
}

/// A product variant with its own price and stock override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Key identifying the variant within its product (e.g., "large-blue").
    pub key: VariantKey,
    /// Variant name (e.g., "Large / Blue").
    pub name: String,
    /// Price of this variant.
    pub price: Money,
    /// Stock count. `None` means stock is not tracked.
    pub stock: Option<i64>,
}

impl ProductVariant {
    /// Create a new variant.
    pub fn new(key: impl Into<VariantKey>, name: impl Into<String>, price: Money) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            price,
            stock: None,
        }
    }

    /// Set a tracked stock count.
    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }
}
