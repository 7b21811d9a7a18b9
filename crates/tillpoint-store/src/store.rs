use std::sync::mpsc::Receiver;

use serde_json::Value;

use crate::error::StoreError;
use crate::event::ChangeEvent;
use crate::query::Query;

/// The trait that all document storage backends implement.
///
/// Documents are JSON objects carrying a string `id` field; collections are
/// created lazily on first use. Calls block until the backend answers and
/// carry no timeout — callers must treat them as unbounded-latency.
pub trait DocumentStore: Send + Sync {
    /// Query documents matching a selector, sorted and limited.
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Like [`DocumentStore::find`] with an implicit limit of one.
    ///
    /// An empty result is a normal `Ok(None)`, never an error.
    fn find_one(&self, collection: &str, query: &Query) -> Result<Option<Value>, StoreError>;

    /// Fetch a document by primary key.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Count documents matching a query without fetching them.
    fn count(&self, collection: &str, query: &Query) -> Result<usize, StoreError>;

    /// Insert a new document. Returns the document's id.
    fn insert(&self, collection: &str, doc: Value) -> Result<String, StoreError>;

    /// Merge the given patch object's top-level fields into an existing
    /// document (set semantics). Returns the updated document.
    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Value, StoreError>;

    /// Atomic read-modify-write of a single document. The closure receives
    /// the current document; if it errors, nothing is written.
    fn incremental_modify(
        &self,
        collection: &str,
        id: &str,
        apply: &mut dyn FnMut(Value) -> Result<Value, StoreError>,
    ) -> Result<Value, StoreError>;

    /// Delete a document by id. `NotFound` if no such document exists.
    fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Subscribe to changes in a collection. Returns a channel of events;
    /// dropping the receiver ends the subscription.
    fn subscribe(&self, collection: &str) -> Receiver<ChangeEvent>;
}
