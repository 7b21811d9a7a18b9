//! Bundle domain model

use serde::{Deserialize, Serialize};

use crate::id::new_entity_id;

/// One membership entry of a bundle.
///
/// `id` is the member's own id. Product members leave `product_id` empty;
/// variant members carry the owning product's id in `product_id`, which is
/// also how consumers decide which collection to re-read the member from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleMember {
    pub id: String,
    pub product_id: Option<String>,
}

impl BundleMember {
    pub fn product(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_id: None,
        }
    }

    pub fn variant(id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_id: Some(product_id.into()),
        }
    }

    /// Whether this entry points at a variant rather than a product.
    pub fn is_variant(&self) -> bool {
        self.product_id.is_some()
    }
}

/// A composite sale item referencing multiple products/variants.
///
/// With `auto_price` set the price is derived as the sum of the members'
/// live prices and re-derived whenever membership changes; `active` is true
/// iff at least one active member remains.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub fixed_price: bool,
    pub auto_price: bool,
    pub price: String,
    pub products: Vec<BundleMember>,
}

impl Bundle {
    pub fn new(name: impl Into<String>, members: Vec<BundleMember>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            active: true,
            fixed_price: false,
            auto_price: false,
            price: "0".into(),
            products: members,
        }
    }

    /// Whether any membership entry points at the given product or variant id.
    pub fn references(&self, member_id: &str) -> bool {
        self.products.iter().any(|m| m.id == member_id)
    }
}
