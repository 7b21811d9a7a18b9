//! Embedded JSON document store for the tillpoint suite
//!
//! Documents are JSON objects with a string `id`, grouped into named
//! collections. The query model ([`Query`]/[`Selector`]) is compiled to SQL
//! over `json_extract`, and every mutation fans out a [`ChangeEvent`] to the
//! collection's subscribers.

pub mod error;
pub mod event;
pub mod query;
pub mod sql;
pub mod sqlite;
pub mod store;

pub use error::*;
pub use event::*;
pub use query::*;
pub use sqlite::SqliteStore;
pub use store::*;
