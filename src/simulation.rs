//! Synthetic live-use and grant sources that stand in for OS telemetry.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::access_log::MOCK_APPS;
use crate::metrics::{AccessGrants, LiveState, LiveUse};
use crate::permission::PermissionType;

/// Chance that a capability is reported in use at any given instant.
pub const IN_USE_PROBABILITY: f64 = 0.15;

pub fn simulate_live_state<R: Rng + ?Sized>(rng: &mut R) -> LiveState {
    PermissionType::ALL
        .into_iter()
        .map(|permission| {
            let live = if rng.random_bool(IN_USE_PROBABILITY) {
                LiveUse::active(MOCK_APPS[rng.random_range(0..MOCK_APPS.len())])
            } else {
                LiveUse::idle()
            };
            (permission, live)
        })
        .collect()
}

pub fn simulate_access_grants<R: Rng + ?Sized>(rng: &mut R) -> AccessGrants {
    PermissionType::ALL
        .into_iter()
        .map(|permission| {
            let count = rng.random_range(1..=MOCK_APPS.len());
            let apps = MOCK_APPS
                .choose_multiple(rng, count)
                .map(|app| app.to_string())
                .collect();
            (permission, apps)
        })
        .collect()
}
