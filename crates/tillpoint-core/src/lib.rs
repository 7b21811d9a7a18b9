//! Data-access core for the tillpoint POS suite
//!
//! Everything between the UI layer and the embedded document store lives
//! here:
//! - [`Repository`]: typed query/mutation façade per entity collection
//! - [`QueryCache`]: time-boxed, capacity-bounded cache for list views
//! - [`pagination`]: cursor selectors and first/last page probes
//! - [`bundles`]: referential maintenance after product/variant deletion
//! - [`ImagePipeline`]: off-thread attachment decoding
//! - [`Catalog`] / [`Sales`]: the CRUD orchestration on top of all of it

pub mod bundles;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod images;
pub mod pagination;
pub mod repo;
pub mod sales;

pub use bundles::*;
pub use cache::*;
pub use catalog::*;
pub use error::*;
pub use images::*;
pub use pagination::*;
pub use repo::*;
pub use sales::*;
