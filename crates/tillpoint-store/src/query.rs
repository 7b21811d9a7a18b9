use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter predicate for document queries.
///
/// Field paths address top-level document fields (`"name"`, `"price"`);
/// `"id"` addresses the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    Eq(String, Value),
    Gt(String, Value),
    Lt(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    /// Case-insensitive substring match on a string field.
    ContainsCi(String, String),

    And(Vec<Selector>),
    Or(Vec<Selector>),
    Not(Box<Selector>),
}

/// Sort descriptor for query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub ascending: bool,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// A query against a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub selector: Option<Selector>,
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
}

impl Query {
    /// Match every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(selector: Selector) -> Self {
        Self {
            selector: Some(selector),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_query_is_empty() {
        let q = Query::default();
        assert!(q.selector.is_none());
        assert!(q.sort.is_none());
        assert!(q.limit.is_none());
    }

    #[test]
    fn query_serde_round_trip() {
        let q = Query::filtered(Selector::And(vec![
            Selector::Eq("active".into(), json!(true)),
            Selector::Or(vec![
                Selector::ContainsCi("name".into(), "coffee".into()),
                Selector::Gt("id".into(), json!("01928")),
            ]),
        ]))
        .with_sort(SortOrder::desc("id"))
        .with_limit(25);
        let text = serde_json::to_string(&q).unwrap();
        let back: Query = serde_json::from_str(&text).unwrap();
        assert_eq!(q, back);
    }
}
