//! Perishable stock allocation across distributed warehouses.
//!
//! A [`DistributionEngine`] admits delivery orders, serves each one from the
//! closest warehouses holding the earliest-expiring stock, and advances the
//! simulation a day at a time: expiring old batches and injecting new ones.

pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod simulation;
pub mod spatial;

pub use error::{DistributionError, LoadError, Result};
pub use model::batch::{BatchId, VaccineBatch};
pub use model::order::{Order, OrderId, OrderStatus};
pub use model::point::Point;
pub use model::warehouse::{Warehouse, WarehouseId};
pub use simulation::config::DistributionConfig;
pub use simulation::engine::DistributionEngine;
pub use spatial::index::SpatialIndex;
pub use spatial::traits::Locatable;
