use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use tillpoint_domain::{from_cents, sanitize_numeric, to_cents, LineItem, Order, Sale, SaleProduct};
use tillpoint_store::{DocumentStore, Query, Selector};

use crate::error::AppError;
use crate::repo::{ErrorNotifier, Repository};

/// Input line for order capture.
#[derive(Debug, Clone)]
pub struct OrderLine {
    /// Id of the sold product or variant.
    pub id: String,
    pub name: String,
    pub price: String,
    pub quantity: i64,
}

/// Sale sessions and order capture.
///
/// Session revenue is never mutated blindly: after every capture or cancel
/// it is re-derived from the session's non-canceled orders.
pub struct Sales {
    sales: Repository<Sale>,
    orders: Repository<Order>,
}

impl Sales {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sales: Repository::new(Arc::clone(&store)),
            orders: Repository::new(store),
        }
    }

    pub fn with_notifier(store: Arc<dyn DocumentStore>, notifier: ErrorNotifier) -> Self {
        Self {
            sales: Repository::new(Arc::clone(&store)).with_notifier(notifier.clone()),
            orders: Repository::new(store).with_notifier(notifier),
        }
    }

    pub fn sales(&self) -> &Repository<Sale> {
        &self.sales
    }

    pub fn orders(&self) -> &Repository<Order> {
        &self.orders
    }

    /// Open a new sale session with a snapshot of the sellable items.
    pub fn open_sale(&self, name: &str, products: Vec<SaleProduct>) -> Result<Sale, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::domain("Name is required"));
        }
        let sale = Sale::new(name.trim(), products);
        self.sales.insert(&sale)?;
        Ok(sale)
    }

    pub fn finish_sale(&self, id: &str) -> Result<Sale, AppError> {
        let sale = self.sales.require(id)?;
        if sale.finished {
            return Err(AppError::domain("Sale is already finished"));
        }
        self.sales.modify(id, |mut s| {
            s.finished = true;
            s.modified = Utc::now();
            s
        })
    }

    /// Capture an order into an open sale session.
    ///
    /// Line totals are `price * quantity`; the order total is their sum and
    /// `change = tendered - total`. The session's order list and re-derived
    /// revenue are persisted with the capture.
    pub fn capture_order(
        &self,
        sale_id: &str,
        name: &str,
        lines: Vec<OrderLine>,
        tendered: &str,
    ) -> Result<Order, AppError> {
        let sale = self.sales.require(sale_id)?;
        if sale.finished {
            return Err(AppError::domain("Sale is already finished"));
        }
        if lines.is_empty() {
            return Err(AppError::domain("Order needs at least one line item"));
        }

        let mut items = Vec::with_capacity(lines.len());
        let mut total_cents = 0i64;
        for line in lines {
            if line.quantity <= 0 {
                return Err(AppError::domain(format!(
                    "Line '{}' has a non-positive quantity",
                    line.name
                )));
            }
            let price_cents = to_cents(&line.price).ok_or_else(|| {
                AppError::domain(format!("Line '{}' has a non-numeric price", line.name))
            })?;
            let line_cents = price_cents.checked_mul(line.quantity).ok_or_else(|| {
                AppError::domain(format!("Line '{}' total is out of range", line.name))
            })?;
            total_cents = total_cents
                .checked_add(line_cents)
                .ok_or_else(|| AppError::domain("Order total is out of range"))?;
            items.push(LineItem {
                id: line.id,
                name: line.name,
                price: line.price,
                quantity: line.quantity,
                total: from_cents(line_cents),
            });
        }

        let tendered = sanitize_numeric(tendered);
        let tendered_cents = to_cents(&tendered)
            .ok_or_else(|| AppError::domain("Tendered amount must be numeric"))?;
        if tendered_cents < total_cents {
            return Err(AppError::domain("Tendered amount is below the order total"));
        }

        let mut order = Order::new(sale_id, name);
        order.products = items;
        order.total = from_cents(total_cents);
        order.tendered = tendered;
        order.change = from_cents(tendered_cents - total_cents);
        self.orders.insert(&order)?;

        let revenue = self.revenue_for(sale_id)?;
        let order_id = order.id.clone();
        self.sales.modify(sale_id, move |mut s| {
            s.orders.push(order_id.clone());
            s.revenue = revenue.clone();
            s.modified = Utc::now();
            s
        })?;
        Ok(order)
    }

    /// Cancel a captured order and re-derive the session revenue without it.
    ///
    /// The cancel flag and the revenue rewrite are two separate document
    /// writes; the owning sale is fetched up front so a missing session
    /// fails before the order is touched. A failure between the two writes
    /// still leaves the order canceled with the revenue not yet re-derived.
    pub fn cancel_order(&self, order_id: &str) -> Result<Order, AppError> {
        let order = self.orders.require(order_id)?;
        if order.canceled {
            return Err(AppError::domain("Order is already canceled"));
        }
        self.sales.require(&order.sale_id)?;
        let order = self.orders.update(order_id, json!({"canceled": true}))?;

        let revenue = self.revenue_for(&order.sale_id)?;
        self.sales.modify(&order.sale_id, move |mut s| {
            s.revenue = revenue.clone();
            s.modified = Utc::now();
            s
        })?;
        Ok(order)
    }

    /// Sum of the non-canceled order totals of a sale.
    fn revenue_for(&self, sale_id: &str) -> Result<String, AppError> {
        let orders = self.orders.find(&Query::filtered(Selector::Eq(
            "sale_id".into(),
            json!(sale_id),
        )))?;
        let mut cents = 0i64;
        for order in orders.iter().filter(|o| !o.canceled) {
            cents += to_cents(&order.total).ok_or_else(|| {
                AppError::domain(format!("Order {} has a non-numeric total", order.id))
            })?;
        }
        Ok(from_cents(cents))
    }
}
