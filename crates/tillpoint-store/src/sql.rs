use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::query::{Query, Selector, SortOrder};

/// Compiled SQL query fragment with bound parameters.
pub(crate) struct CompiledQuery {
    pub where_clause: String,
    pub params: Vec<SqlValue>,
    pub order_clause: String,
    pub limit_clause: String,
}

/// Translate a Query into SQL fragments over the `(id, doc)` document table.
pub(crate) fn compile_query(q: &Query) -> CompiledQuery {
    let mut params = Vec::new();

    let where_clause = match &q.selector {
        Some(selector) => {
            let (sql, sel_params) = compile_selector(selector);
            params.extend(sel_params);
            format!("WHERE {}", sql)
        }
        None => String::new(),
    };

    let order_clause = match &q.sort {
        Some(sort) => compile_sort(sort),
        None => String::new(),
    };

    let limit_clause = match q.limit {
        Some(limit) => format!("LIMIT {}", limit),
        None => String::new(),
    };

    CompiledQuery {
        where_clause,
        params,
        order_clause,
        limit_clause,
    }
}

fn compile_selector(selector: &Selector) -> (String, Vec<SqlValue>) {
    let mut params = Vec::new();
    let sql = match selector {
        Selector::Eq(field, value) => comparison(field, "=", value, &mut params),
        Selector::Gt(field, value) => comparison(field, ">", value, &mut params),
        Selector::Lt(field, value) => comparison(field, "<", value, &mut params),
        Selector::Gte(field, value) => comparison(field, ">=", value, &mut params),
        Selector::Lte(field, value) => comparison(field, "<=", value, &mut params),
        Selector::ContainsCi(field, text) => {
            let col = field_to_column(field);
            params.push(SqlValue::Text(escape_like(&text.to_lowercase())));
            format!(
                "LOWER(COALESCE({}, '')) LIKE '%' || ? || '%' ESCAPE '\\'",
                col
            )
        }
        Selector::And(selectors) => combine(selectors, " AND ", "1", &mut params),
        Selector::Or(selectors) => combine(selectors, " OR ", "0", &mut params),
        Selector::Not(inner) => {
            let (sql, ps) = compile_selector(inner);
            params.extend(ps);
            format!("NOT ({})", sql)
        }
    };
    (sql, params)
}

fn comparison(field: &str, op: &str, value: &Value, params: &mut Vec<SqlValue>) -> String {
    let col = field_to_column(field);
    match value {
        // `col = NULL` never matches in SQL; use IS (NOT) NULL instead
        Value::Null => match op {
            "=" => format!("{} IS NULL", col),
            _ => format!("{} IS NOT NULL", col),
        },
        _ => {
            params.push(value_to_sql(value));
            format!("{} {} ?", col, op)
        }
    }
}

fn combine(
    selectors: &[Selector],
    joiner: &str,
    empty: &str,
    params: &mut Vec<SqlValue>,
) -> String {
    if selectors.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = selectors
        .iter()
        .map(|s| {
            let (sql, ps) = compile_selector(s);
            params.extend(ps);
            sql
        })
        .collect();
    format!("({})", parts.join(joiner))
}

fn compile_sort(sort: &SortOrder) -> String {
    let col = field_to_column(&sort.field);
    let dir = if sort.ascending { "ASC" } else { "DESC" };
    format!("ORDER BY {} {}", col, dir)
}

/// Escape LIKE wildcards so search text matches only literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Map a field path to a SQL column expression.
///
/// `id` is the primary key column; everything else is addressed inside the
/// JSON document.
fn field_to_column(field: &str) -> String {
    match field {
        "id" => "id".to_string(),
        f => format!("json_extract(doc, '$.{}')", f),
    }
}

/// Convert a JSON value to a rusqlite value.
pub(crate) fn value_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            SqlValue::Text(serde_json::to_string(value).unwrap_or_default())
        }
    }
}
