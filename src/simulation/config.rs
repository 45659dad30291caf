// src/simulation/config.rs

use std::ops::RangeInclusive;

#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Warehouses considered in the first dispatch round. Doubles each round.
    pub initial_search_radius: usize,
    /// Largest single order, as a percentage of available stock.
    pub max_order_share_percent: u32,
    pub replenish_batch_count: RangeInclusive<u32>,
    pub replenish_batch_size: RangeInclusive<u32>,
    pub replenish_days_to_expire: RangeInclusive<u32>,
    /// Fixed seed for replenishment. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl DistributionConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            initial_search_radius: 5,
            max_order_share_percent: 10,
            replenish_batch_count: 10..=50,
            replenish_batch_size: 50..=200,
            replenish_days_to_expire: 10..=30,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_daily_tick_rules() {
        let config = DistributionConfig::default();
        assert_eq!(config.initial_search_radius, 5);
        assert_eq!(config.max_order_share_percent, 10);
        assert_eq!(config.replenish_batch_count, 10..=50);
        assert_eq!(config.replenish_batch_size, 50..=200);
        assert_eq!(config.replenish_days_to_expire, 10..=30);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn with_seed_keeps_other_defaults() {
        let config = DistributionConfig::with_seed(42);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.initial_search_radius, 5);
    }
}
