use chrono::TimeDelta;
use std::time::Duration;

use crate::device::DEFAULT_SENSOR_INTERVAL;
use crate::status::Platform;

/// Size of the synthetic history generated at startup.
pub const DEFAULT_SEED_ENTRIES: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct DashConfig {
    pub seed_entries: usize,
    pub seed_window: TimeDelta,
    pub sensor_interval: Duration,
    pub platform: Platform,
    /// Fixed RNG seed; `None` draws from the thread RNG.
    pub rng_seed: Option<u64>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            seed_entries: DEFAULT_SEED_ENTRIES,
            seed_window: TimeDelta::hours(24),
            sensor_interval: DEFAULT_SENSOR_INTERVAL,
            platform: Platform::default(),
            rng_seed: None,
        }
    }
}
