// src/spatial/traits.rs

use crate::model::point::Point;

/// Anything that sits at a fixed position on the map.
///
/// The spatial index only needs a location to rank items, so warehouses
/// (and test doubles) plug in through this trait.
pub trait Locatable {
    fn location(&self) -> Point;
}

impl Locatable for Point {
    fn location(&self) -> Point {
        *self
    }
}
