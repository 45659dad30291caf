// src/simulation/engine.rs

use crate::error::{DistributionError, Result};
use crate::model::batch::{total_quantity, VaccineBatch};
use crate::model::order::{Order, OrderId, OrderStatus};
use crate::model::point::Point;
use crate::model::warehouse::{Warehouse, WarehouseId};
use crate::simulation::config::DistributionConfig;
use crate::spatial::index::SpatialIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Allocates warehouse stock to delivery orders, one simulated day at a time.
///
/// The engine exclusively owns every warehouse and order. Accessors hand
/// out copies so callers can never reach into live state.
#[derive(Debug)]
pub struct DistributionEngine {
    config: DistributionConfig,
    rng: StdRng,

    // Stock
    warehouses: SpatialIndex<Warehouse>,
    available_quantity: u32,

    // Orders
    next_order_id: u64,
    pending_orders: VecDeque<OrderId>,
    orders: HashMap<OrderId, Order>,
    current_day_orders: Vec<OrderId>,
    previous_day_orders: Vec<OrderId>,

    current_day: u32,
}

impl DistributionEngine {
    pub fn new(warehouses: Vec<Warehouse>) -> Self {
        Self::with_config(DistributionConfig::default(), warehouses)
    }

    pub fn with_config(config: DistributionConfig, warehouses: Vec<Warehouse>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // The only full scan: every later change is applied incrementally
        let available_quantity: u32 = warehouses.iter().map(Warehouse::available_quantity).sum();
        info!(
            warehouses = warehouses.len(),
            available_quantity, "distribution engine initialised"
        );

        Self {
            config,
            rng,
            warehouses: SpatialIndex::from_items(warehouses),
            available_quantity,
            next_order_id: 0,
            pending_orders: VecDeque::new(),
            orders: HashMap::new(),
            current_day_orders: Vec::new(),
            previous_day_orders: Vec::new(),
            current_day: 0,
        }
    }

    pub fn add_warehouse(&mut self, warehouse: Warehouse) {
        self.available_quantity += warehouse.available_quantity();
        info!(warehouse = %warehouse, "warehouse added");
        self.warehouses.add(warehouse);
    }

    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    /// Units in valid stock across all warehouses.
    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    pub fn pending_order_count(&self) -> usize {
        self.pending_orders.len()
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.warehouses.items().to_vec()
    }

    pub fn current_day_orders(&self) -> Vec<Order> {
        self.snapshot(&self.current_day_orders)
    }

    pub fn previous_day_orders(&self) -> Vec<Order> {
        self.snapshot(&self.previous_day_orders)
    }

    /// Looks up an order from today or yesterday.
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).cloned()
    }

    /// Admits a new order into the pending queue.
    ///
    /// # Errors
    /// `InvalidArgument` when `quantity` is zero or exceeds the configured
    /// share of available stock (10% by default, inclusive).
    pub fn create_order(&mut self, quantity: u32, delivery_location: Point) -> Result<OrderId> {
        if quantity == 0 {
            warn!(quantity, "rejected order with invalid quantity");
            return Err(DistributionError::InvalidArgument(
                "order quantity must be positive".to_string(),
            ));
        }

        let share = u64::from(self.config.max_order_share_percent);
        if u64::from(quantity) * 100 > u64::from(self.available_quantity) * share {
            warn!(
                quantity,
                available = self.available_quantity,
                location = %delivery_location,
                "rejected order above admission quota"
            );
            return Err(DistributionError::InvalidArgument(format!(
                "cannot order more than {}% of available stock ({} requested, {} available)",
                share, quantity, self.available_quantity
            )));
        }

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;

        let order = Order::new(id, quantity, delivery_location);
        info!(order = %order, "order created");
        self.orders.insert(id, order);
        self.pending_orders.push_back(id);
        self.current_day_orders.push(id);
        debug!(pending = self.pending_orders.len(), "pending orders updated");

        Ok(id)
    }

    /// Dispatches the order at the head of the pending queue and returns
    /// its final state.
    ///
    /// # Errors
    /// `NoPendingOrders` when the queue is empty, `ConsistencyViolation`
    /// when a non-rejected order was not supplied exactly.
    pub fn dispatch_next_order(&mut self) -> Result<Order> {
        let order_id = self
            .pending_orders
            .pop_front()
            .ok_or(DistributionError::NoPendingOrders)?;
        // Pending orders always live in today's buffer
        let mut order = self
            .orders
            .remove(&order_id)
            .ok_or(DistributionError::NoPendingOrders)?;

        let started = Instant::now();
        info!(order = %order, "order dispatching started");

        let fragments = self.dispatch_order(&mut order);
        order.set_dispatched_batches(fragments);
        let outcome = order
            .set_processing_day(self.current_day)
            .and_then(|_| order.verify_fulfillment());

        info!(
            order = %order,
            contributions = ?order.contributions(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "order dispatching finished"
        );
        self.orders.insert(order_id, order.clone());

        if let Err(err) = outcome {
            error!(error = %err, dispatched = ?order.dispatched_batches(), "dispatch invariant broken");
            return Err(err);
        }
        Ok(order)
    }

    /// Drains the pending queue in admission order.
    pub fn dispatch_orders(&mut self) -> Result<()> {
        while !self.pending_orders.is_empty() {
            self.dispatch_next_order()?;
        }
        Ok(())
    }

    /// Runs the daily tick.
    ///
    /// A consistency violation while dispatching aborts the tick before the
    /// day advances.
    pub fn finish_day(&mut self) -> Result<()> {
        // =================================================================
        // PHASE 1: Flush every order admitted today
        // =================================================================
        self.dispatch_orders()?;

        // =================================================================
        // PHASE 2: Advance and age inventory
        // =================================================================
        self.current_day += 1;
        self.dispose_expired();

        // =================================================================
        // PHASE 3: Replenish and rotate history
        // =================================================================
        self.replenish();
        self.roll_order_history();

        info!(
            day = self.current_day,
            available = self.available_quantity,
            "day finished"
        );
        Ok(())
    }

    // =====================================================================
    // Dispatch algorithm
    // =====================================================================

    /// Widening search: draw from the `radius` closest warehouses, doubling
    /// the radius until the order is covered or every warehouse has been
    /// tried. On rejection all claimed stock is returned.
    fn dispatch_order(&mut self, order: &mut Order) -> Vec<VaccineBatch> {
        let mut radius = self.config.initial_search_radius.max(1);
        let mut remaining = order.quantity();
        let mut fragments = Vec::new();

        for round in 0..max_search_rounds(self.warehouses.len()) {
            if remaining > self.available_quantity {
                info!(
                    order_id = %order.id(),
                    remaining,
                    available = self.available_quantity,
                    "not enough stock in the system"
                );
                self.reject(order, fragments);
                return Vec::new();
            }

            remaining -= self.dispatch_round(
                order.delivery_location(),
                radius,
                remaining,
                &mut fragments,
            );

            if remaining == 0 {
                order.set_status(OrderStatus::Dispatched);
                return fragments;
            }
            if radius >= self.warehouses.len() {
                break;
            }

            info!(
                order_id = %order.id(),
                round,
                remaining,
                next_radius = radius.saturating_mul(2),
                "closest warehouses exhausted, widening search"
            );
            radius = radius.saturating_mul(2);
        }

        warn!(
            order_id = %order.id(),
            remaining,
            "order cannot be covered by any warehouse, rolling back"
        );
        self.reject(order, fragments);
        Vec::new()
    }

    /// One pass over the `radius` closest warehouses. Each candidate is
    /// drained at most once, in the priority order of its head batch.
    /// Returns the units taken.
    fn dispatch_round(
        &mut self,
        location: Point,
        radius: usize,
        remaining: u32,
        fragments: &mut Vec<VaccineBatch>,
    ) -> u32 {
        let started = Instant::now();
        let candidates = self.warehouses.k_closest_indices(location, radius);
        debug!(
            radius,
            found = candidates.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "closest warehouses computed"
        );

        let mut heads = BinaryHeap::new();
        let mut by_id: HashMap<WarehouseId, usize> = HashMap::new();
        for index in candidates {
            let Some(warehouse) = self.warehouses.get_mut(index) else {
                continue;
            };
            if warehouse.available_quantity() == 0 {
                continue;
            }
            let id = warehouse.id();
            if let Some(top) = warehouse.peek_top_priority() {
                heads.push(Reverse(top.priority()));
                by_id.insert(id, index);
            }
        }

        let mut taken = 0;
        while taken < remaining {
            let Some(Reverse(head)) = heads.pop() else {
                break;
            };
            let Some(index) = head.owner.and_then(|owner| by_id.get(&owner).copied()) else {
                continue;
            };
            let Some(warehouse) = self.warehouses.get_mut(index) else {
                continue;
            };

            let supplied = warehouse.dispatch(remaining - taken);
            let quantity = total_quantity(&supplied);
            taken += quantity;
            self.available_quantity -= quantity;
            fragments.extend(supplied);
        }

        debug!(
            taken,
            missing = remaining - taken,
            available = self.available_quantity,
            "dispatch round finished"
        );
        taken
    }

    fn reject(&mut self, order: &mut Order, fragments: Vec<VaccineBatch>) {
        for fragment in fragments {
            let quantity = fragment.quantity();
            let owner = fragment.owner();
            match self.warehouses.iter_mut().find(|w| Some(w.id()) == owner) {
                Some(warehouse) => {
                    warehouse.restock(fragment);
                    self.available_quantity += quantity;
                }
                None => warn!(batch = %fragment.id(), "fragment without a known owner dropped"),
            }
        }
        order.set_status(OrderStatus::Rejected);
    }

    // =====================================================================
    // Daily maintenance
    // =====================================================================

    fn dispose_expired(&mut self) {
        let started = Instant::now();
        let day = self.current_day;

        let expired: u32 = self
            .warehouses
            .iter_mut()
            .map(|warehouse| warehouse.sweep_expired(day))
            .sum();
        self.available_quantity -= expired;

        info!(
            day,
            expired,
            available = self.available_quantity,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "expired stock disposed"
        );
    }

    fn replenish(&mut self) {
        if self.warehouses.is_empty() {
            return;
        }
        let started = Instant::now();

        let batch_count = self.rng.gen_range(self.config.replenish_batch_count.clone());
        let mut inserted = 0;
        for _ in 0..batch_count {
            let size = self.rng.gen_range(self.config.replenish_batch_size.clone());
            let days_to_expire = self.rng.gen_range(self.config.replenish_days_to_expire.clone());
            let index = self.rng.gen_range(0..self.warehouses.len());

            if let Some(warehouse) = self.warehouses.get_mut(index) {
                warehouse.register_batch(VaccineBatch::new(size, self.current_day + days_to_expire));
                self.available_quantity += size;
                inserted += size;
            }
        }

        info!(
            batches = batch_count,
            inserted,
            available = self.available_quantity,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stock replenished"
        );
    }

    fn roll_order_history(&mut self) {
        let today = std::mem::take(&mut self.current_day_orders);
        let stale = std::mem::replace(&mut self.previous_day_orders, today);
        for id in stale {
            self.orders.remove(&id);
        }
    }

    fn snapshot(&self, ids: &[OrderId]) -> Vec<Order> {
        ids.iter()
            .filter_map(|id| self.orders.get(id).cloned())
            .collect()
    }
}

/// Upper bound on widening rounds: `ceil(log2(n)) + 1`, at least one.
fn max_search_rounds(warehouse_count: usize) -> usize {
    warehouse_count.max(1).next_power_of_two().trailing_zeros() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse(name: &str, x: i32, stock: &[(u32, u32)]) -> Warehouse {
        let mut warehouse = Warehouse::new(name, Point::new(x, 0));
        for &(quantity, expiration) in stock {
            warehouse.register_batch(VaccineBatch::new(quantity, expiration));
        }
        warehouse
    }

    #[test]
    fn search_rounds_cover_every_doubling() {
        assert_eq!(max_search_rounds(0), 1);
        assert_eq!(max_search_rounds(1), 1);
        assert_eq!(max_search_rounds(5), 4);
        assert_eq!(max_search_rounds(20), 6);
        assert_eq!(max_search_rounds(1024), 11);
    }

    #[test]
    fn exhausted_search_rolls_back_claimed_stock() {
        let mut engine = DistributionEngine::with_config(
            DistributionConfig::with_seed(7),
            vec![
                warehouse("A", 1, &[(30, 10), (20, 12)]),
                warehouse("B", 2, &[(40, 10)]),
            ],
        );
        // Pretend the running total drifted above real stock so the order
        // passes the global check but no warehouse can cover it.
        engine.available_quantity += 1_000;
        engine.create_order(100, Point::new(0, 0)).expect("within quota");

        let order = engine.dispatch_next_order().expect("rejection is not an error");

        assert!(order.is_rejected());
        assert!(order.dispatched_batches().is_empty());
        assert!(order.contributions().is_empty());
        assert_eq!(engine.available_quantity(), 1_090);

        let stock: Vec<u32> = engine
            .warehouses()
            .iter()
            .map(Warehouse::available_quantity)
            .collect();
        assert_eq!(stock, vec![50, 40]);
    }

    #[test]
    fn rejected_rollback_restores_batch_layout() {
        let mut engine = DistributionEngine::with_config(
            DistributionConfig::with_seed(7),
            vec![warehouse("A", 1, &[(30, 10), (20, 12)])],
        );
        engine.available_quantity += 1_000;
        engine.create_order(80, Point::new(0, 0)).expect("within quota");

        engine.dispatch_next_order().expect("rejection is not an error");

        let warehouses = engine.warehouses();
        let quantities: Vec<u32> = warehouses[0].batches().map(VaccineBatch::quantity).collect();
        assert_eq!(quantities, vec![30, 20]);
    }

    #[test]
    fn history_keeps_only_two_days() {
        let mut engine = DistributionEngine::with_config(
            DistributionConfig::with_seed(1),
            vec![warehouse("A", 1, &[(1_000, 100)])],
        );

        let first = engine.create_order(10, Point::new(0, 0)).expect("within quota");
        engine.finish_day().expect("tick succeeds");
        engine.create_order(10, Point::new(0, 0)).expect("within quota");
        engine.finish_day().expect("tick succeeds");

        assert!(engine.order(first).is_none());
        assert_eq!(engine.orders.len(), 1);
    }

    #[test]
    fn consistency_violation_halts_the_day() {
        let mut depot = warehouse("A", 1, &[(10, 10)]);
        depot.stock_unowned(VaccineBatch::new(100, 20));
        let mut engine =
            DistributionEngine::with_config(DistributionConfig::with_seed(3), vec![depot]);
        // 10 units come from A's own batch, 1 from the batch nobody owns
        let id = engine.create_order(11, Point::new(0, 0)).expect("within quota");

        let err = engine.finish_day().unwrap_err();

        assert!(matches!(
            err,
            DistributionError::ConsistencyViolation {
                requested: 11,
                dispatched: 10,
                ..
            }
        ));
        assert_eq!(engine.current_day(), 0);
        assert!(engine.previous_day_orders().is_empty());
        assert_eq!(engine.order(id).map(|order| order.processing_day()), Some(Some(0)));
    }
}
