// src/io/reporting.rs

use crate::model::order::{Order, OrderStatus};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One CSV row per processed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub day: u32,
    pub order_id: u64,
    pub quantity: u32,
    pub delivery_x: i32,
    pub delivery_y: i32,
    pub status: OrderStatus,
    pub dispatched: u32,
    /// `warehouse_id:units` pairs separated by `;`
    pub contributions: String,
}

impl OrderRecord {
    pub fn from_order(order: &Order) -> Self {
        let contributions = order
            .contributions()
            .iter()
            .map(|(warehouse, units)| format!("{}:{}", warehouse.0, units))
            .collect::<Vec<_>>()
            .join(";");

        Self {
            day: order.processing_day().unwrap_or_default(),
            order_id: order.id().0,
            quantity: order.quantity(),
            delivery_x: order.delivery_location().x,
            delivery_y: order.delivery_location().y,
            status: order.status(),
            dispatched: order.dispatched_quantity(),
            contributions,
        }
    }
}

/// Writes processed orders to a CSV file.
///
/// # Arguments
/// * `file_path` - The path to save the file (e.g., "results/orders.csv").
/// * `data` - The order rows collected over the run.
pub fn write_order_log(file_path: impl AsRef<Path>, data: &[OrderRecord]) -> Result<(), csv::Error> {
    let path = file_path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;

    for record in data {
        wtr.serialize(record)?;
    }

    // Flush the buffer to ensure all data is written
    wtr.flush()?;

    info!(rows = data.len(), path = %path.display(), "order log exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::batch::VaccineBatch;
    use crate::model::order::OrderId;
    use crate::model::point::Point;
    use crate::model::warehouse::Warehouse;

    #[test]
    fn record_flattens_contributions() {
        let mut warehouse = Warehouse::new("A", Point::new(0, 0));
        warehouse.register_batch(VaccineBatch::new(50, 9));

        let mut order = Order::new(OrderId(4), 20, Point::new(2, -3));
        order.set_dispatched_batches(warehouse.dispatch(20));
        order.set_status(OrderStatus::Dispatched);
        order.set_processing_day(6).expect("first set");

        let record = OrderRecord::from_order(&order);

        assert_eq!(record.day, 6);
        assert_eq!(record.order_id, 4);
        assert_eq!(record.delivery_y, -3);
        assert_eq!(record.dispatched, 20);
        assert_eq!(record.contributions, format!("{}:20", warehouse.id().0));
    }

    #[test]
    fn rejected_order_has_no_contributions() {
        let mut order = Order::new(OrderId(1), 20, Point::new(0, 0));
        order.set_status(OrderStatus::Rejected);

        let record = OrderRecord::from_order(&order);
        assert_eq!(record.status, OrderStatus::Rejected);
        assert!(record.contributions.is_empty());
    }
}
