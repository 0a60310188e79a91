//! Per-permission usage metrics derived from the access log.
//!
//! [`compute`] is a pure function of its arguments: the evaluation instant is
//! passed in, never read from the clock, so identical inputs always produce
//! an identical [`PermissionMap`].

use serde::Serialize;
use std::collections::HashMap;

use crate::access_log::AccessLogEntry;
use crate::permission::{PermissionMap, PermissionType};

/// Rolling lookback used for `count_24h`, in milliseconds.
pub const WINDOW_24H_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PermissionMetric {
    pub count_24h: usize,
    pub access_count: usize,
    pub in_use: bool,
    pub current_app: Option<String>,
    pub access_list: Vec<String>,
}

/// Upstream report of whether a capability is active right now.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LiveUse {
    pub in_use: bool,
    pub current_app: Option<String>,
}

impl LiveUse {
    pub fn active(app: impl Into<String>) -> Self {
        Self {
            in_use: true,
            current_app: Some(app.into()),
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

pub type LiveState = HashMap<PermissionType, LiveUse>;

/// Apps holding a grant for each capability. Authoritative for
/// `access_list`; see [`grants_from_log`] for a log-derived registry.
pub type AccessGrants = HashMap<PermissionType, Vec<String>>;

pub fn is_within_24h(timestamp: i64, now: i64) -> bool {
    now.checked_sub(timestamp)
        .is_some_and(|age| (0..=WINDOW_24H_MS).contains(&age))
}

pub fn compute(
    entries: &[AccessLogEntry],
    live_state: &LiveState,
    access_grants: &AccessGrants,
    now: i64,
) -> PermissionMap<PermissionMetric> {
    let mut metrics: PermissionMap<PermissionMetric> = PermissionMap::default();

    for entry in entries.iter().filter(|e| is_within_24h(e.timestamp, now)) {
        metrics[entry.permission].count_24h += 1;
    }

    for permission in PermissionType::ALL {
        let metric = &mut metrics[permission];

        if let Some(apps) = access_grants.get(&permission) {
            metric.access_list = apps.clone();
        }
        metric.access_count = metric.access_list.len();

        match live_state.get(&permission) {
            Some(LiveUse {
                in_use: true,
                current_app: Some(app),
            }) => {
                metric.in_use = true;
                metric.current_app = Some(app.clone());
            }
            Some(LiveUse {
                in_use: true,
                current_app: None,
            }) => {
                tracing::warn!(%permission, "capability reported in use without a consumer app; treating as idle");
            }
            _ => {}
        }
    }

    metrics
}

/// Build a grant registry from the log: every app that accessed a type,
/// de-duplicated, most recent first.
pub fn grants_from_log(entries: &[AccessLogEntry]) -> AccessGrants {
    let mut sorted: Vec<&AccessLogEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut grants = AccessGrants::new();
    for entry in sorted {
        let apps = grants.entry(entry.permission).or_default();
        if !apps.contains(&entry.app_name) {
            apps.push(entry.app_name.clone());
        }
    }
    grants
}
