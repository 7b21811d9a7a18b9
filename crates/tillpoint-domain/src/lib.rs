//! POS domain types shared across the tillpoint suite
//!
//! This crate provides the canonical domain models for point-of-sale data:
//! - Product / Variant: catalog items with price, stock and SKU
//! - Bundle: a composite sale item referencing products/variants
//! - Sale: a sales session accumulating orders and revenue
//! - Order: a captured order with line items, tender and change
//!
//! Plus identifier generation, money arithmetic on price strings, and the
//! sanitization/validation helpers used by input flows.

pub mod bundle;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod sale;
pub mod sanitize;
pub mod validation;
pub mod variant;

pub use bundle::*;
pub use id::*;
pub use money::*;
pub use order::*;
pub use product::*;
pub use sale::*;
pub use sanitize::*;
pub use validation::*;
pub use variant::*;
