// src/model/batch.rs

use crate::model::warehouse::WarehouseId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub u64);

impl BatchId {
    fn next() -> Self {
        Self(NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Dispatch ordering key. Field order is the comparison order:
/// earliest expiration first, then the smaller batch, then the
/// warehouse id and finally the batch id, which makes it total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchPriority {
    pub expiration_day: u32,
    pub quantity: u32,
    pub owner: Option<WarehouseId>,
    pub batch_id: BatchId,
}

/// A perishable unit of stock.
///
/// Fragments returned by [`VaccineBatch::dispatch`] share the source's id,
/// expiration and owner but carry only the dispatched quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineBatch {
    id: BatchId,
    quantity: u32,
    expiration_day: u32,
    expired: bool,
    owner: Option<WarehouseId>,
}

impl VaccineBatch {
    pub fn new(quantity: u32, expiration_day: u32) -> Self {
        Self {
            id: BatchId::next(),
            quantity,
            expiration_day,
            expired: false,
            owner: None,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn expiration_day(&self) -> u32 {
        self.expiration_day
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// The warehouse holding this batch. `None` until it is registered.
    pub fn owner(&self) -> Option<WarehouseId> {
        self.owner
    }

    pub fn priority(&self) -> BatchPriority {
        BatchPriority {
            expiration_day: self.expiration_day,
            quantity: self.quantity,
            owner: self.owner,
            batch_id: self.id,
        }
    }

    /// Splits off up to `amount` units.
    ///
    /// The source keeps whatever is left; the returned fragment holds
    /// `min(amount, quantity)`.
    pub fn dispatch(&mut self, amount: u32) -> VaccineBatch {
        let taken = amount.min(self.quantity);
        self.quantity -= taken;
        VaccineBatch {
            quantity: taken,
            ..self.clone()
        }
    }

    pub(crate) fn assign_owner(&mut self, owner: WarehouseId) {
        self.owner = Some(owner);
    }

    pub(crate) fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub(crate) fn absorb(&mut self, quantity: u32) {
        self.quantity += quantity;
    }
}

/// Total units across a set of fragments.
pub fn total_quantity(batches: &[VaccineBatch]) -> u32 {
    batches.iter().map(VaccineBatch::quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = VaccineBatch::new(10, 5);
        let b = VaccineBatch::new(10, 5);
        assert!(b.id() > a.id());
    }

    #[test]
    fn dispatch_splits_off_a_fragment() {
        let mut batch = VaccineBatch::new(100, 12);
        let fragment = batch.dispatch(30);

        assert_eq!(batch.quantity(), 70);
        assert_eq!(fragment.quantity(), 30);
        assert_eq!(fragment.id(), batch.id());
        assert_eq!(fragment.expiration_day(), 12);
    }

    #[test]
    fn dispatch_is_capped_by_available_quantity() {
        let mut batch = VaccineBatch::new(20, 3);
        let fragment = batch.dispatch(50);

        assert_eq!(fragment.quantity(), 20);
        assert_eq!(batch.quantity(), 0);
    }

    #[test]
    fn priority_prefers_earlier_expiration_then_smaller_quantity() {
        let soon = VaccineBatch::new(500, 4);
        let later = VaccineBatch::new(10, 9);
        assert!(soon.priority() < later.priority());

        let small = VaccineBatch::new(10, 9);
        assert!(small.priority() < VaccineBatch::new(11, 9).priority());
    }

    #[test]
    fn priority_falls_back_to_batch_id() {
        let first = VaccineBatch::new(10, 9);
        let second = VaccineBatch::new(10, 9);
        assert!(first.priority() < second.priority());
    }

    #[test]
    fn total_quantity_sums_fragments() {
        let fragments = vec![VaccineBatch::new(3, 1), VaccineBatch::new(4, 1)];
        assert_eq!(total_quantity(&fragments), 7);
        assert_eq!(total_quantity(&[]), 0);
    }
}
