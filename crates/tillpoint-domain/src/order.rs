//! Order domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::new_entity_id;

/// One line of an order: a product or variant with quantity and line total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Id of the sold product or variant.
    pub id: String,
    pub name: String,
    pub price: String,
    pub quantity: i64,
    /// `price * quantity`, as a price string.
    pub total: String,
}

/// A captured order within a sale session.
///
/// `total` is the sum of the line item totals; `change = tendered - total`.
/// Canceled orders stay persisted but are excluded from the session revenue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub sale_id: String,
    pub canceled: bool,
    pub name: String,
    pub products: Vec<LineItem>,
    pub tendered: String,
    pub change: String,
    pub total: String,
    pub created: DateTime<Utc>,
}

impl Order {
    pub fn new(sale_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            sale_id: sale_id.into(),
            canceled: false,
            name: name.into(),
            products: Vec::new(),
            tendered: "0".into(),
            change: "0".into(),
            total: "0".into(),
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_serde_round_trip() {
        let mut o = Order::new("sale-1", "Order #1");
        o.products.push(LineItem {
            id: "prod-1".into(),
            name: "Coffee".into(),
            price: "3.5".into(),
            quantity: 2,
            total: "7".into(),
        });
        o.total = "7".into();
        o.tendered = "10".into();
        o.change = "3".into();
        let json = serde_json::to_string(&o).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(o, back);
    }
}
