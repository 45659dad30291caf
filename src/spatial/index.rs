// src/spatial/index.rs

use crate::model::point::Point;
use crate::spatial::traits::Locatable;
use std::collections::BinaryHeap;

/// A flat collection of located items answering "k closest" queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    items: Vec<T>,
}

// Heap entry. Ordered by distance so the heap top is the farthest kept item.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    distance_squared: i64,
    index: usize,
}

impl<T: Locatable> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Positions of the `k` items closest to `point`, in no particular order.
    ///
    /// Keeps a max-heap of at most `k` candidates so the scan is
    /// O(n log k). A candidate replaces the current farthest only when it
    /// is strictly closer; ties at the boundary keep the earlier item.
    pub fn k_closest_indices(&self, point: Point, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        if k >= self.items.len() {
            return (0..self.items.len()).collect();
        }

        let mut heap = BinaryHeap::with_capacity(k);
        for (index, item) in self.items.iter().enumerate() {
            let distance_squared = point.distance_squared(&item.location());

            if heap.len() < k {
                heap.push(Candidate {
                    distance_squared,
                    index,
                });
                continue;
            }

            let farthest = heap.peek().map_or(i64::MAX, |c| c.distance_squared);
            if distance_squared < farthest {
                heap.pop();
                heap.push(Candidate {
                    distance_squared,
                    index,
                });
            }
        }

        heap.into_iter().map(|candidate| candidate.index).collect()
    }

    /// The `k` items closest to `point`.
    pub fn k_closest(&self, point: Point, k: usize) -> Vec<&T> {
        self.k_closest_indices(point, k)
            .into_iter()
            .map(|index| &self.items[index])
            .collect()
    }
}

impl<T: Locatable> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
