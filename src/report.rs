// =============================================================================
// SALES REPORT
// =============================================================================
// Aggregates the order log over a trailing window of days.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Order, OrderData};

/// How many of the latest orders the report lists individually.
pub const RECENT_ORDER_LIMIT: usize = 10;

/// Per-coffee totals inside the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoffeeSales {
    pub coffee_name: String,
    pub order_count: usize,
    pub total_bags: u64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub days: u32,
    pub since: DateTime<Utc>,
    pub total_orders: usize,
    pub total_revenue: f64,
    pub total_bags: u64,
    /// Sorted by revenue, highest first
    pub by_coffee: Vec<CoffeeSales>,
    /// Newest first, at most `RECENT_ORDER_LIMIT`
    pub recent: Vec<Order>,
}

impl SalesReport {
    /// Build the report for orders dated on or after `now - days`.
    pub fn build(orders: &OrderData, days: u32, now: DateTime<Utc>) -> Self {
        let since = now - Duration::days(i64::from(days));
        let mut in_window: Vec<&Order> = orders
            .orders
            .iter()
            .filter(|o| o.order_date >= since)
            .collect();

        let total_revenue = in_window.iter().map(|o| o.total_price).sum();
        let total_bags = in_window.iter().map(|o| u64::from(o.quantity_bags)).sum();

        // Grouped by the name snapshot, like the order log stores it
        let mut grouped: HashMap<&str, CoffeeSales> = HashMap::new();
        for order in &in_window {
            let entry = grouped
                .entry(order.coffee_name.as_str())
                .or_insert_with(|| CoffeeSales {
                    coffee_name: order.coffee_name.clone(),
                    order_count: 0,
                    total_bags: 0,
                    total_revenue: 0.0,
                });
            entry.order_count += 1;
            entry.total_bags += u64::from(order.quantity_bags);
            entry.total_revenue += order.total_price;
        }
        let mut by_coffee: Vec<CoffeeSales> = grouped.into_values().collect();
        by_coffee.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.coffee_name.cmp(&b.coffee_name))
        });

        in_window.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        let recent = in_window
            .iter()
            .take(RECENT_ORDER_LIMIT)
            .map(|o| (*o).clone())
            .collect();

        Self {
            days,
            since,
            total_orders: in_window.len(),
            total_revenue,
            total_bags,
            by_coffee,
            recent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_orders == 0
    }

    pub fn average_order_value(&self) -> f64 {
        if self.total_orders == 0 {
            0.0
        } else {
            self.total_revenue / self.total_orders as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(name: &str, bags: u32, price: f64, days_ago: i64, now: DateTime<Utc>) -> Order {
        Order {
            id: format!("{}-{}", name, days_ago),
            coffee_id: name.to_lowercase(),
            coffee_name: name.into(),
            quantity_bags: bags,
            price_per_bag: price,
            total_price: f64::from(bags) * price,
            order_date: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_report_window_and_totals() {
        let now = Utc::now();
        let orders = OrderData {
            orders: vec![
                order("Kenya", 2, 10.0, 1, now),
                order("Brazil", 5, 8.0, 3, now),
                order("Kenya", 1, 10.0, 5, now),
                order("Kenya", 9, 10.0, 45, now),
            ],
        };

        let report = SalesReport::build(&orders, 30, now);
        assert_eq!(report.total_orders, 3);
        assert_eq!(report.total_bags, 8);
        assert_eq!(report.total_revenue, 70.0);
        assert!((report.average_order_value() - 70.0 / 3.0).abs() < 1e-9);

        assert_eq!(report.by_coffee[0].coffee_name, "Brazil");
        assert_eq!(report.by_coffee[0].total_revenue, 40.0);
        assert_eq!(report.by_coffee[1].coffee_name, "Kenya");
        assert_eq!(report.by_coffee[1].order_count, 2);

        assert_eq!(report.recent.len(), 3);
        assert_eq!(report.recent[0].id, "Kenya-1");
    }

    #[test]
    fn test_empty_report() {
        let report = SalesReport::build(&OrderData::default(), 7, Utc::now());
        assert!(report.is_empty());
        assert_eq!(report.average_order_value(), 0.0);
        assert!(report.by_coffee.is_empty());
    }

    #[test]
    fn test_recent_is_capped() {
        let now = Utc::now();
        let orders = OrderData {
            orders: (0..15).map(|d| order("Peru", 1, 9.0, d, now)).collect(),
        };
        let report = SalesReport::build(&orders, 30, now);
        assert_eq!(report.total_orders, 15);
        assert_eq!(report.recent.len(), RECENT_ORDER_LIMIT);
    }
}
