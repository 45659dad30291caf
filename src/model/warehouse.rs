// src/model/warehouse.rs

use crate::model::batch::{BatchPriority, VaccineBatch};
use crate::model::point::Point;
use crate::spatial::traits::Locatable;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_WAREHOUSE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WarehouseId(pub u64);

impl fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// A located stock-holding node.
///
/// Batches are kept in dispatch-priority order. Expired or emptied
/// entries are purged before the head is ever handed out.
#[derive(Debug, Clone)]
pub struct Warehouse {
    // Identity
    id: WarehouseId,
    name: String,
    location: Point,

    // Inventory
    available_quantity: u32,
    batches: BTreeMap<BatchPriority, VaccineBatch>,
    expired_batches: Vec<VaccineBatch>,
}

impl Warehouse {
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            id: WarehouseId(NEXT_WAREHOUSE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            location,
            available_quantity: 0,
            batches: BTreeMap::new(),
            expired_batches: Vec::new(),
        }
    }

    pub fn id(&self) -> WarehouseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units held in valid (non-expired, non-empty) batches.
    pub fn available_quantity(&self) -> u32 {
        self.available_quantity
    }

    /// Batches that were swept out on expiry, oldest first.
    pub fn expired_batches(&self) -> &[VaccineBatch] {
        &self.expired_batches
    }

    /// Queued batches in dispatch order.
    pub fn batches(&self) -> impl Iterator<Item = &VaccineBatch> {
        self.batches.values()
    }

    pub fn register_batch(&mut self, mut batch: VaccineBatch) {
        batch.assign_owner(self.id);
        self.available_quantity += batch.quantity();
        self.insert(batch);
    }

    /// The highest-priority valid batch, if any.
    pub fn peek_top_priority(&mut self) -> Option<&VaccineBatch> {
        self.purge_head();
        self.batches.values().next()
    }

    /// Takes up to `requested` units, best-priority batches first.
    ///
    /// Returns one fragment per batch touched. Short supply is not an
    /// error: the fragments simply add up to less than was asked for.
    pub fn dispatch(&mut self, requested: u32) -> Vec<VaccineBatch> {
        let mut remaining = requested;
        let mut fragments = Vec::new();

        while remaining > 0 {
            self.purge_head();
            let Some((_, mut batch)) = self.batches.pop_first() else {
                break;
            };

            let fragment = batch.dispatch(remaining);
            remaining -= fragment.quantity();
            self.available_quantity -= fragment.quantity();

            // A partially used batch only moves forward in priority
            if batch.quantity() > 0 {
                self.insert(batch);
            }
            fragments.push(fragment);
        }

        fragments
    }

    /// Removes every batch expiring on or before `current_day`.
    ///
    /// Batches are ordered by expiration first, so this only walks the
    /// head of the queue. Returns the number of units that expired.
    pub fn sweep_expired(&mut self, current_day: u32) -> u32 {
        let mut expired_quantity = 0;

        while let Some(entry) = self.batches.first_entry() {
            let batch = entry.get();
            if batch.quantity() > 0 && batch.expiration_day() > current_day {
                break;
            }

            let mut batch = entry.remove();
            if batch.quantity() == 0 {
                continue;
            }

            batch.mark_expired();
            expired_quantity += batch.quantity();
            self.available_quantity -= batch.quantity();
            debug!(
                warehouse = %self.id,
                batch = %batch.id(),
                quantity = batch.quantity(),
                current_day,
                "batch expired"
            );
            self.expired_batches.push(batch);
        }

        expired_quantity
    }

    /// Returns a dispatched fragment to stock.
    ///
    /// The units merge back into the source batch when it is still
    /// queued, otherwise the fragment is queued again on its own.
    pub(crate) fn restock(&mut self, fragment: VaccineBatch) {
        let existing = self
            .batches
            .keys()
            .find(|key| key.batch_id == fragment.id())
            .copied();

        self.available_quantity += fragment.quantity();
        match existing.and_then(|key| self.batches.remove(&key)) {
            Some(mut batch) => {
                batch.absorb(fragment.quantity());
                self.insert(batch);
            }
            None => {
                let mut batch = fragment;
                batch.assign_owner(self.id);
                self.insert(batch);
            }
        }
    }

    /// Queues a batch without claiming it, so its fragments carry no owner.
    #[cfg(test)]
    pub(crate) fn stock_unowned(&mut self, batch: VaccineBatch) {
        self.available_quantity += batch.quantity();
        self.insert(batch);
    }

    /// Queues `batch`, folding in any entry it would displace. Merging
    /// changes the key, so this repeats until the slot is free.
    fn insert(&mut self, mut batch: VaccineBatch) {
        while let Some(displaced) = self.batches.remove(&batch.priority()) {
            batch.absorb(displaced.quantity());
        }
        self.batches.insert(batch.priority(), batch);
    }

    fn purge_head(&mut self) {
        while let Some(entry) = self.batches.first_entry() {
            let batch = entry.get();
            if batch.quantity() > 0 && !batch.is_expired() {
                break;
            }
            entry.remove();
        }
    }
}

impl Locatable for Warehouse {
    fn location(&self) -> Point {
        self.location
    }
}

impl fmt::Display for Warehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' at {}", self.id, self.name, self.location)
    }
}
