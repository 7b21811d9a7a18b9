//! Variant domain model

use serde::{Deserialize, Serialize};

use crate::id::new_entity_id;

/// A variant of a product (size, flavor, ...), priced independently.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    /// Owning product.
    pub product_id: String,
    pub active: bool,
    pub name: String,
    pub price: String,
    pub stock: i64,
    pub sku: Option<String>,
}

impl Variant {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            id: new_entity_id(),
            product_id: product_id.into(),
            active: true,
            name: name.into(),
            price: price.into(),
            stock: 0,
            sku: None,
        }
    }
}
