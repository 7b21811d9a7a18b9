use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::StoreError;
use crate::event::ChangeEvent;
use crate::query::Query;
use crate::sql::compile_query;
use crate::store::DocumentStore;

/// SQLite-backed implementation of the DocumentStore trait.
///
/// Each collection is one `docs_<name>` table with the document id as the
/// primary key and the document itself as a JSON text column. SQLite owns
/// storage and indexing; this type owns the document/JSON mapping and the
/// change-event fan-out.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    subscribers: Mutex<HashMap<String, Vec<Sender<ChangeEvent>>>>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Storage(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| StoreError::Storage(format!("init: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Mutex::new(HashMap::new()),
        })
    }

    fn table(collection: &str) -> Result<String, StoreError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        Ok(format!("docs_{}", collection))
    }

    fn ensure_collection(conn: &Connection, table: &str) -> Result<(), StoreError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            );",
            table
        ))
        .map_err(|e| StoreError::Storage(format!("ensure_collection: {}", e)))
    }

    fn emit(&self, collection: &str, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(senders) = subscribers.get_mut(collection) {
            // Prune subscribers whose receiver has been dropped
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    fn read_doc(conn: &Connection, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let text: Option<String> = conn
            .query_row(
                &format!("SELECT doc FROM \"{}\" WHERE id = ?1", table),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("get: {}", e)))?;
        match text {
            Some(text) => {
                let doc = serde_json::from_str(&text)
                    .map_err(|e| StoreError::Serialize(format!("decode {}: {}", id, e)))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn write_doc(conn: &Connection, table: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(doc).map_err(|e| StoreError::Serialize(e.to_string()))?;
        conn.execute(
            &format!("UPDATE \"{}\" SET doc = ?2 WHERE id = ?1", table),
            params![id, text],
        )
        .map_err(|e| StoreError::Storage(format!("update: {}", e)))?;
        Ok(())
    }
}

/// Extract the mandatory string `id` field from a document.
fn doc_id(doc: &Value) -> Result<String, StoreError> {
    doc.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Serialize("document is missing a string 'id' field".into()))
}

/// Merge the top-level fields of `patch` into `doc` (set semantics).
fn merge_fields(doc: &mut Value, patch: Value) -> Result<(), StoreError> {
    let patch = match patch {
        Value::Object(map) => map,
        _ => return Err(StoreError::Serialize("patch must be a JSON object".into())),
    };
    let target = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::Serialize("stored document is not an object".into()))?;
    for (key, value) in patch {
        target.insert(key, value);
    }
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let table = Self::table(collection)?;
        let compiled = compile_query(query);
        let conn = self.conn.lock().unwrap();
        Self::ensure_collection(&conn, &table)?;

        let sql = format!(
            "SELECT doc FROM \"{}\" {} {} {}",
            table, compiled.where_clause, compiled.order_clause, compiled.limit_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Storage(format!("find: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(compiled.params), |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| StoreError::Storage(format!("find: {}", e)))?;

        let mut docs = Vec::new();
        for row in rows {
            let text = row.map_err(|e| StoreError::Storage(format!("find: {}", e)))?;
            let doc = serde_json::from_str(&text)
                .map_err(|e| StoreError::Serialize(format!("decode: {}", e)))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    fn find_one(&self, collection: &str, query: &Query) -> Result<Option<Value>, StoreError> {
        let mut query = query.clone();
        query.limit = Some(1);
        Ok(self.find(collection, &query)?.into_iter().next())
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let table = Self::table(collection)?;
        let conn = self.conn.lock().unwrap();
        Self::ensure_collection(&conn, &table)?;
        Self::read_doc(&conn, &table, id)
    }

    fn count(&self, collection: &str, query: &Query) -> Result<usize, StoreError> {
        let table = Self::table(collection)?;
        let compiled = compile_query(query);
        let conn = self.conn.lock().unwrap();
        Self::ensure_collection(&conn, &table)?;

        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" {}",
            table, compiled.where_clause
        );
        conn.query_row(&sql, params_from_iter(compiled.params), |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| StoreError::Storage(format!("count: {}", e)))
    }

    fn insert(&self, collection: &str, doc: Value) -> Result<String, StoreError> {
        let table = Self::table(collection)?;
        let id = doc_id(&doc)?;
        let text = serde_json::to_string(&doc).map_err(|e| StoreError::Serialize(e.to_string()))?;
        {
            let conn = self.conn.lock().unwrap();
            Self::ensure_collection(&conn, &table)?;
            conn.execute(
                &format!("INSERT INTO \"{}\" (id, doc) VALUES (?1, ?2)", table),
                params![id, text],
            )
            .map_err(|e| {
                if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                    if err.code == rusqlite::ErrorCode::ConstraintViolation {
                        return StoreError::AlreadyExists(id.clone());
                    }
                }
                StoreError::Storage(format!("insert: {}", e))
            })?;
        }
        self.emit(collection, ChangeEvent::Inserted { id: id.clone(), doc });
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        let table = Self::table(collection)?;
        let doc = {
            let conn = self.conn.lock().unwrap();
            Self::ensure_collection(&conn, &table)?;
            let mut doc = Self::read_doc(&conn, &table, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            merge_fields(&mut doc, patch)?;
            Self::write_doc(&conn, &table, id, &doc)?;
            doc
        };
        self.emit(
            collection,
            ChangeEvent::Updated {
                id: id.to_string(),
                doc: doc.clone(),
            },
        );
        Ok(doc)
    }

    fn incremental_modify(
        &self,
        collection: &str,
        id: &str,
        apply: &mut dyn FnMut(Value) -> Result<Value, StoreError>,
    ) -> Result<Value, StoreError> {
        let table = Self::table(collection)?;
        let doc = {
            let conn = self.conn.lock().unwrap();
            Self::ensure_collection(&conn, &table)?;
            let current = Self::read_doc(&conn, &table, id)?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let doc = apply(current)?;
            if doc_id(&doc)? != id {
                return Err(StoreError::Storage(
                    "incremental_modify must not change the document id".into(),
                ));
            }
            Self::write_doc(&conn, &table, id, &doc)?;
            doc
        };
        self.emit(
            collection,
            ChangeEvent::Updated {
                id: id.to_string(),
                doc: doc.clone(),
            },
        );
        Ok(doc)
    }

    fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let table = Self::table(collection)?;
        {
            let conn = self.conn.lock().unwrap();
            Self::ensure_collection(&conn, &table)?;
            let changed = conn
                .execute(
                    &format!("DELETE FROM \"{}\" WHERE id = ?1", table),
                    params![id],
                )
                .map_err(|e| StoreError::Storage(format!("remove: {}", e)))?;
            if changed == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        self.emit(collection, ChangeEvent::Removed { id: id.to_string() });
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Selector, SortOrder};
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn product(id: &str, name: &str, active: bool) -> Value {
        json!({"id": id, "name": name, "active": active, "price": "3.5"})
    }

    #[test]
    fn insert_and_get() {
        let s = store();
        let id = s.insert("product", product("p1", "Coffee", true)).unwrap();
        assert_eq!(id, "p1");
        let doc = s.get("product", "p1").unwrap().unwrap();
        assert_eq!(doc["name"], "Coffee");
        assert!(s.get("product", "p2").unwrap().is_none());
    }

    #[test]
    fn insert_requires_string_id() {
        let s = store();
        let err = s.insert("product", json!({"name": "no id"})).unwrap_err();
        assert!(matches!(err, StoreError::Serialize(_)));
    }

    #[test]
    fn duplicate_insert_fails() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        let err = s
            .insert("product", product("p1", "Coffee", true))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(id) if id == "p1"));
    }

    #[test]
    fn find_filters_by_selector() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        s.insert("product", product("p2", "Tea", false)).unwrap();
        s.insert("product", product("p3", "Cocoa", true)).unwrap();

        let active = s
            .find(
                "product",
                &Query::filtered(Selector::Eq("active".into(), json!(true))),
            )
            .unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn contains_ci_is_case_insensitive() {
        let s = store();
        s.insert("product", product("p1", "Flat White", true))
            .unwrap();
        s.insert("product", product("p2", "Espresso", true)).unwrap();

        let hits = s
            .find(
                "product",
                &Query::filtered(Selector::ContainsCi("name".into(), "WHITE".into())),
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], "p1");
    }

    #[test]
    fn contains_ci_treats_wildcards_as_literal_text() {
        let s = store();
        s.insert("product", product("p1", "Coffee 100ml", true))
            .unwrap();
        s.insert("product", product("p2", "Tea", true)).unwrap();

        // '%' and '_' in the search text must not act as LIKE wildcards
        let by = |text: &str| {
            s.find(
                "product",
                &Query::filtered(Selector::ContainsCi("name".into(), text.into())),
            )
            .unwrap()
        };
        assert!(by("100%").is_empty());
        assert!(by("t_a").is_empty());

        let hits = by("100ml");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["id"], "p1");
    }

    #[test]
    fn sort_and_limit() {
        let s = store();
        for id in ["a", "c", "b"] {
            s.insert("product", product(id, id, true)).unwrap();
        }
        let docs = s
            .find(
                "product",
                &Query::all().with_sort(SortOrder::desc("id")).with_limit(2),
            )
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn find_one_empty_is_ok_none() {
        let s = store();
        let hit = s.find_one("product", &Query::all()).unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn count_matches_find() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        s.insert("product", product("p2", "Tea", false)).unwrap();
        let q = Query::filtered(Selector::Eq("active".into(), json!(true)));
        assert_eq!(s.count("product", &q).unwrap(), 1);
        assert_eq!(s.count("product", &Query::all()).unwrap(), 2);
    }

    #[test]
    fn update_merges_top_level_fields() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        let doc = s
            .update("product", "p1", json!({"name": "Filter Coffee", "stock": 5}))
            .unwrap();
        assert_eq!(doc["name"], "Filter Coffee");
        assert_eq!(doc["stock"], 5);
        // Untouched fields survive the merge
        assert_eq!(doc["price"], "3.5");
    }

    #[test]
    fn update_missing_document_is_not_found() {
        let s = store();
        let err = s
            .update("product", "ghost", json!({"name": "x"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "ghost"));
    }

    #[test]
    fn incremental_modify_applies_closure() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        let doc = s
            .incremental_modify("product", "p1", &mut |mut doc| {
                doc["stock"] = json!(9);
                Ok(doc)
            })
            .unwrap();
        assert_eq!(doc["stock"], 9);
        assert_eq!(s.get("product", "p1").unwrap().unwrap()["stock"], 9);
    }

    #[test]
    fn incremental_modify_error_writes_nothing() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        let err = s
            .incremental_modify("product", "p1", &mut |_| {
                Err(StoreError::Storage("member read failed".into()))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(s.get("product", "p1").unwrap().unwrap()["name"], "Coffee");
    }

    #[test]
    fn incremental_modify_rejects_id_change() {
        let s = store();
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        let err = s
            .incremental_modify("product", "p1", &mut |mut doc| {
                doc["id"] = json!("p2");
                Ok(doc)
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn remove_missing_document_is_not_found() {
        let s = store();
        let err = s.remove("product", "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn invalid_collection_name_is_rejected() {
        let s = store();
        let err = s.get("Products; DROP TABLE", "p1").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)));
    }

    #[test]
    fn subscribers_receive_change_events() {
        let s = store();
        let rx = s.subscribe("product");
        let other = s.subscribe("product");

        s.insert("product", product("p1", "Coffee", true)).unwrap();
        s.update("product", "p1", json!({"stock": 1})).unwrap();
        s.remove("product", "p1").unwrap();

        for rx in [&rx, &other] {
            assert!(matches!(
                rx.try_recv().unwrap(),
                ChangeEvent::Inserted { id, .. } if id == "p1"
            ));
            assert!(matches!(
                rx.try_recv().unwrap(),
                ChangeEvent::Updated { id, .. } if id == "p1"
            ));
            assert!(matches!(
                rx.try_recv().unwrap(),
                ChangeEvent::Removed { id } if id == "p1"
            ));
        }
    }

    #[test]
    fn dropped_subscriber_does_not_break_mutations() {
        let s = store();
        drop(s.subscribe("product"));
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        // The dead sender was pruned
        assert!(s.subscribers.lock().unwrap()["product"].is_empty());
    }

    #[test]
    fn events_are_scoped_to_their_collection() {
        let s = store();
        let rx = s.subscribe("order");
        s.insert("product", product("p1", "Coffee", true)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.db");
        {
            let s = SqliteStore::open(&path).unwrap();
            s.insert("product", product("p1", "Coffee", true)).unwrap();
        }
        let s = SqliteStore::open(&path).unwrap();
        assert_eq!(s.get("product", "p1").unwrap().unwrap()["name"], "Coffee");
    }
}
