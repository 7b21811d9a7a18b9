//! Product domain model

use serde::{Deserialize, Serialize};

use crate::id::new_entity_id;

/// A catalog product.
///
/// Prices are decimal strings (see [`crate::money`]); `variants` holds the ids
/// of the product's variants, which live in their own collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub active: bool,
    pub name: String,
    pub price: String,
    pub stock: i64,
    /// Stock-keeping unit; unique across products when present.
    pub sku: Option<String>,
    pub variants: Vec<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            active: true,
            name: name.into(),
            price: price.into(),
            stock: 0,
            sku: None,
            variants: Vec::new(),
        }
    }
}
