use std::marker::PhantomData;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use tillpoint_domain::{Bundle, Order, Product, Sale, Variant};
use tillpoint_store::{ChangeEvent, DocumentStore, Query, StoreError};

use crate::error::AppError;

/// A persisted entity type bound to a named collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

impl Entity for Product {
    const COLLECTION: &'static str = "product";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Variant {
    const COLLECTION: &'static str = "variant";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Bundle {
    const COLLECTION: &'static str = "bundle";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Sale {
    const COLLECTION: &'static str = "sale";
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Order {
    const COLLECTION: &'static str = "order";
    fn id(&self) -> &str {
        &self.id
    }
}

/// Observer invoked with every error surfaced by a repository.
///
/// The consuming shell uses this to react to error metadata — typically
/// navigating to a not-found view when [`AppError::status`] is 404. It is a
/// callback, not a dependency: repositories work the same without one.
pub type ErrorNotifier = Arc<dyn Fn(&AppError) + Send + Sync>;

/// Typed query/mutation façade over one collection of the document store.
///
/// Every store failure is normalized into [`AppError`] at this boundary.
/// Reads treat an empty result as `Ok(None)`; mutations on a missing id
/// surface a typed not-found error carrying the requested id.
pub struct Repository<E: Entity> {
    store: Arc<dyn DocumentStore>,
    notifier: Option<ErrorNotifier>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            notifier: None,
            _entity: PhantomData,
        }
    }

    pub fn with_notifier(mut self, notifier: ErrorNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn find(&self, query: &Query) -> Result<Vec<E>, AppError> {
        let docs = self
            .store
            .find(E::COLLECTION, query)
            .map_err(|e| self.surface(e.into()))?;
        docs.into_iter().map(|doc| self.decode(doc)).collect()
    }

    pub fn find_one(&self, query: &Query) -> Result<Option<E>, AppError> {
        let doc = self
            .store
            .find_one(E::COLLECTION, query)
            .map_err(|e| self.surface(e.into()))?;
        doc.map(|doc| self.decode(doc)).transpose()
    }

    pub fn get(&self, id: &str) -> Result<Option<E>, AppError> {
        let doc = self
            .store
            .get(E::COLLECTION, id)
            .map_err(|e| self.surface(e.into()))?;
        doc.map(|doc| self.decode(doc)).transpose()
    }

    /// Fetch a mutation target, surfacing a typed not-found error when the
    /// id does not exist.
    pub fn require(&self, id: &str) -> Result<E, AppError> {
        self.get(id)?.ok_or_else(|| {
            self.surface(AppError::NotFound {
                collection: E::COLLECTION,
                id: id.to_string(),
            })
        })
    }

    pub fn count(&self, query: &Query) -> Result<usize, AppError> {
        self.store
            .count(E::COLLECTION, query)
            .map_err(|e| self.surface(e.into()))
    }

    pub fn insert(&self, entity: &E) -> Result<String, AppError> {
        let doc = self.encode(entity)?;
        self.store
            .insert(E::COLLECTION, doc)
            .map_err(|e| self.surface(e.into()))
    }

    /// Partial-field update (set semantics). The patch must be a JSON object.
    pub fn update(&self, id: &str, patch: Value) -> Result<E, AppError> {
        let doc = self
            .store
            .update(E::COLLECTION, id, patch)
            .map_err(|e| self.mutation_err(id, e))?;
        self.decode(doc)
    }

    /// Atomic read-modify-write of one entity.
    pub fn modify(&self, id: &str, mut apply: impl FnMut(E) -> E) -> Result<E, AppError> {
        let doc = self
            .store
            .incremental_modify(E::COLLECTION, id, &mut |doc| {
                let entity: E = serde_json::from_value(doc)
                    .map_err(|e| StoreError::Serialize(e.to_string()))?;
                serde_json::to_value(apply(entity))
                    .map_err(|e| StoreError::Serialize(e.to_string()))
            })
            .map_err(|e| self.mutation_err(id, e))?;
        self.decode(doc)
    }

    pub fn remove(&self, id: &str) -> Result<(), AppError> {
        self.store
            .remove(E::COLLECTION, id)
            .map_err(|e| self.mutation_err(id, e))
    }

    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.store.subscribe(E::COLLECTION)
    }

    fn decode(&self, doc: Value) -> Result<E, AppError> {
        serde_json::from_value(doc).map_err(|e| {
            self.surface(AppError::Backend {
                message: format!("decode {}: {}", E::COLLECTION, e),
                code: None,
                status: None,
            })
        })
    }

    fn encode(&self, entity: &E) -> Result<Value, AppError> {
        serde_json::to_value(entity).map_err(|e| {
            self.surface(AppError::Backend {
                message: format!("encode {}: {}", E::COLLECTION, e),
                code: None,
                status: None,
            })
        })
    }

    /// A missing mutation target is a typed not-found, not a backend error.
    fn mutation_err(&self, id: &str, err: StoreError) -> AppError {
        let err = match err {
            StoreError::NotFound(_) => AppError::NotFound {
                collection: E::COLLECTION,
                id: id.to_string(),
            },
            other => other.into(),
        };
        self.surface(err)
    }

    fn surface(&self, err: AppError) -> AppError {
        if let Some(notifier) = &self.notifier {
            notifier(&err);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tillpoint_store::{Selector, SqliteStore};

    fn repo() -> Repository<Product> {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        Repository::new(store)
    }

    #[test]
    fn insert_and_find_typed() {
        let repo = repo();
        let product = Product::new("Coffee", "3.5");
        repo.insert(&product).unwrap();

        let found = repo
            .find(&Query::filtered(Selector::ContainsCi(
                "name".into(),
                "coff".into(),
            )))
            .unwrap();
        assert_eq!(found, vec![product]);
    }

    #[test]
    fn get_missing_is_ok_none() {
        let repo = repo();
        assert!(repo.get("ghost").unwrap().is_none());
    }

    #[test]
    fn require_missing_is_typed_not_found() {
        let repo = repo();
        let err = repo.require("ghost-id").unwrap_err();
        match err {
            AppError::NotFound { collection, ref id } => {
                assert_eq!(collection, "product");
                assert_eq!(id, "ghost-id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("ghost-id"));
    }

    #[test]
    fn update_patches_fields() {
        let repo = repo();
        let product = Product::new("Coffee", "3.5");
        repo.insert(&product).unwrap();
        let updated = repo
            .update(&product.id, serde_json::json!({"active": false}))
            .unwrap();
        assert!(!updated.active);
        assert_eq!(updated.name, "Coffee");
    }

    #[test]
    fn modify_is_read_modify_write() {
        let repo = repo();
        let product = Product::new("Coffee", "3.5");
        repo.insert(&product).unwrap();
        let updated = repo
            .modify(&product.id, |mut p| {
                p.stock += 5;
                p
            })
            .unwrap();
        assert_eq!(updated.stock, 5);
        assert_eq!(repo.require(&product.id).unwrap().stock, 5);
    }

    #[test]
    fn remove_missing_target_is_not_found() {
        let repo = repo();
        let err = repo.remove("ghost").unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn notifier_sees_surfaced_errors() {
        let statuses: Arc<Mutex<Vec<Option<u16>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let repo: Repository<Product> = Repository::new(store)
            .with_notifier(Arc::new(move |err| sink.lock().unwrap().push(err.status())));

        let _ = repo.require("ghost");
        assert_eq!(statuses.lock().unwrap().as_slice(), &[Some(404)]);
    }

    #[test]
    fn notifier_is_quiet_on_success() {
        let statuses: Arc<Mutex<Vec<Option<u16>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let repo: Repository<Product> = Repository::new(store)
            .with_notifier(Arc::new(move |err| sink.lock().unwrap().push(err.status())));

        repo.insert(&Product::new("Coffee", "3.5")).unwrap();
        assert!(statuses.lock().unwrap().is_empty());
    }
}
