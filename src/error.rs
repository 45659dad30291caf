//! Error types for the distribution engine and its collaborators.

use crate::model::order::OrderId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the engine error type.
pub type Result<T> = std::result::Result<T, DistributionError>;

#[derive(Error, Debug)]
pub enum DistributionError {
    /// Order admission refused (non-positive or over-quota quantity)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Dispatch requested with nothing queued
    #[error("No pending orders to dispatch")]
    NoPendingOrders,

    /// A non-rejected order was not supplied exactly what it requested.
    /// This is an engine defect, never a business outcome.
    #[error(
        "Consistency violation: order {order_id} requested {requested} units but {dispatched} were dispatched"
    )]
    ConsistencyViolation {
        order_id: OrderId,
        requested: u32,
        dispatched: u32,
    },

    #[error("Processing day of order {order_id} already set to {day}")]
    ProcessingDayAlreadySet { order_id: OrderId, day: u32 },
}

/// Failures while importing warehouses.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid warehouse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid record {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}
