// src/model/order.rs

use crate::error::{DistributionError, Result};
use crate::model::batch::{total_quantity, VaccineBatch};
use crate::model::point::Point;
use crate::model::warehouse::WarehouseId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Pending,
    Dispatched,
    Rejected,
}

/// A request to deliver `quantity` units to a location.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    quantity: u32,
    delivery_location: Point,
    status: OrderStatus,
    processing_day: Option<u32>,

    // Outcome of dispatching
    dispatched_batches: Vec<VaccineBatch>,
    contributions: BTreeMap<WarehouseId, u32>,
}

impl Order {
    pub(crate) fn new(id: OrderId, quantity: u32, delivery_location: Point) -> Self {
        Self {
            id,
            quantity,
            delivery_location,
            status: OrderStatus::Pending,
            processing_day: None,
            dispatched_batches: Vec::new(),
            contributions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn delivery_location(&self) -> Point {
        self.delivery_location
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_dispatched(&self) -> bool {
        self.status == OrderStatus::Dispatched
    }

    pub fn is_rejected(&self) -> bool {
        self.status == OrderStatus::Rejected
    }

    pub fn processing_day(&self) -> Option<u32> {
        self.processing_day
    }

    pub fn dispatched_batches(&self) -> &[VaccineBatch] {
        &self.dispatched_batches
    }

    pub fn dispatched_quantity(&self) -> u32 {
        total_quantity(&self.dispatched_batches)
    }

    /// Units supplied per contributing warehouse.
    pub fn contributions(&self) -> &BTreeMap<WarehouseId, u32> {
        &self.contributions
    }

    pub(crate) fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    pub(crate) fn set_processing_day(&mut self, day: u32) -> Result<()> {
        if let Some(existing) = self.processing_day {
            return Err(DistributionError::ProcessingDayAlreadySet {
                order_id: self.id,
                day: existing,
            });
        }
        self.processing_day = Some(day);
        Ok(())
    }

    /// Records the fragments this order received and folds them into the
    /// per-warehouse contribution map.
    pub(crate) fn set_dispatched_batches(&mut self, batches: Vec<VaccineBatch>) {
        self.contributions.clear();
        for batch in &batches {
            if let Some(owner) = batch.owner() {
                *self.contributions.entry(owner).or_insert(0) += batch.quantity();
            }
        }
        self.dispatched_batches = batches;
    }

    /// Fails if a non-rejected order did not receive exactly what it asked
    /// for, or if part of it cannot be traced back to a warehouse.
    pub(crate) fn verify_fulfillment(&self) -> Result<()> {
        if self.is_rejected() {
            return Ok(());
        }
        let attributed: u32 = self.contributions.values().sum();
        let mismatch = [self.dispatched_quantity(), attributed]
            .into_iter()
            .find(|&total| total != self.quantity);
        if let Some(dispatched) = mismatch {
            return Err(DistributionError::ConsistencyViolation {
                order_id: self.id,
                requested: self.quantity,
                dispatched,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} units to {}, {:?})",
            self.id, self.quantity, self.delivery_location, self.status
        )
    }
}
