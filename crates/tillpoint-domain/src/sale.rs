//! Sale session domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::new_entity_id;

/// Snapshot of a sellable item taken when a sale session opens, so the
/// session keeps displaying the prices it was opened with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleProduct {
    pub id: String,
    pub name: String,
    pub price: String,
}

/// A sales session.
///
/// `revenue` is re-derived from the session's non-canceled orders whenever
/// an order is captured or canceled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub name: String,
    pub finished: bool,
    pub revenue: String,
    pub products: Vec<SaleProduct>,
    pub orders: Vec<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Sale {
    pub fn new(name: impl Into<String>, products: Vec<SaleProduct>) -> Self {
        let now = Utc::now();
        Self {
            id: new_entity_id(),
            name: name.into(),
            finished: false,
            revenue: "0".into(),
            products,
            orders: Vec::new(),
            created: now,
            modified: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_serde_round_trip() {
        let s = Sale::new(
            "Saturday market",
            vec![SaleProduct {
                id: "prod-1".into(),
                name: "Coffee".into(),
                price: "3.5".into(),
            }],
        );
        let json = serde_json::to_string(&s).unwrap();
        let back: Sale = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn new_sale_starts_open_with_zero_revenue() {
        let s = Sale::new("s", vec![]);
        assert!(!s.finished);
        assert_eq!(s.revenue, "0");
        assert!(s.orders.is_empty());
    }
}
