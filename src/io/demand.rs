// src/io/demand.rs

use crate::model::point::Point;
use crate::spatial::traits::Locatable;
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};

/// An order the driver wants to place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderRequest {
    pub quantity: u32,
    pub location: Point,
}

/// Generates how many orders arrive each day from a Normal (Bell Curve)
/// distribution. Negative samples are clamped to 0.
///
/// # Arguments
/// * `days` - Length of the simulation.
/// * `mean` - The average number of orders per day (e.g., 8.0).
/// * `std_dev` - The day-to-day volatility (e.g., 3.0).
pub fn generate_daily_order_counts<R: Rng + ?Sized>(
    rng: &mut R,
    days: usize,
    mean: f64,
    std_dev: f64,
) -> Result<Vec<u32>, NormalError> {
    let normal = Normal::new(mean, std_dev)?;

    let schedule = (0..days)
        .map(|_| {
            let value: f64 = normal.sample(&mut *rng);
            let rounded = value.round();
            if rounded < 0.0 {
                0
            } else {
                rounded as u32
            }
        })
        .collect();

    Ok(schedule)
}

/// Smallest axis-aligned box containing every item, as (min, max) corners.
pub fn bounding_box<T: Locatable>(items: &[T]) -> Option<(Point, Point)> {
    let first = items.first()?.location();
    let corners = items.iter().fold((first, first), |(lo, hi), item| {
        let p = item.location();
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    });
    Some(corners)
}

/// Draws an order somewhere inside `area` for between 1 and
/// `max_quantity` units. Returns `None` when nothing may be ordered.
pub fn random_order_request<R: Rng + ?Sized>(
    rng: &mut R,
    area: (Point, Point),
    max_quantity: u32,
) -> Option<OrderRequest> {
    if max_quantity == 0 {
        return None;
    }
    let (lo, hi) = area;
    Some(OrderRequest {
        quantity: rng.gen_range(1..=max_quantity),
        location: Point::new(rng.gen_range(lo.x..=hi.x), rng.gen_range(lo.y..=hi.y)),
    })
}
