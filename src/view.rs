//! Presentation state for the dashboard tiles and the per-permission screen.

use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::fmt::Display;

use crate::access_log::AccessLogEntry;
use crate::metrics::PermissionMetric;
use crate::permission::{GrantState, PermissionMap, PermissionStatus, PermissionType};
use crate::status::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTile {
    pub permission: PermissionType,
    pub label: &'static str,
    pub grant: GrantState,
    pub is_granted: bool,
    /// Drawn with the LIVE badge.
    pub live: bool,
    pub current_app: Option<String>,
    pub count_24h: usize,
    pub access_count: usize,
}

/// Location counts as granted only while the device-wide service is on.
pub fn is_granted(permission: PermissionType, status: &PermissionStatus) -> bool {
    let granted = status.grant == GrantState::Granted;
    match permission {
        PermissionType::Location => granted && status.service_enabled == Some(true),
        _ => granted,
    }
}

pub fn tile(permission: PermissionType, status: &PermissionStatus, metric: &PermissionMetric) -> StatusTile {
    StatusTile {
        permission,
        label: permission.tile_label(),
        grant: status.grant,
        is_granted: is_granted(permission, status),
        live: metric.in_use,
        current_app: metric.current_app.clone(),
        count_24h: metric.count_24h,
        access_count: metric.access_count,
    }
}

/// One tile per capability the platform exposes, in catalog order.
pub fn tiles(
    statuses: &PermissionMap<PermissionStatus>,
    metrics: &PermissionMap<PermissionMetric>,
    platform: Platform,
) -> Vec<StatusTile> {
    PermissionType::ALL
        .into_iter()
        .filter(|p| platform.supports(*p))
        .map(|p| tile(p, &statuses[p], &metrics[p]))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDetail {
    pub permission: PermissionType,
    pub label: &'static str,
    pub status: PermissionStatus,
    pub metric: PermissionMetric,
    /// This capability's log entries, newest first.
    pub history: Vec<AccessLogEntry>,
}

impl PermissionDetail {
    pub fn status_line(&self) -> String {
        match &self.metric.current_app {
            Some(app) if self.metric.in_use => format!("In use by {app}"),
            _ => "Not in use".to_string(),
        }
    }
}

pub fn detail(
    permission: PermissionType,
    status: &PermissionStatus,
    metric: &PermissionMetric,
    entries: &[AccessLogEntry],
) -> PermissionDetail {
    let mut history: Vec<AccessLogEntry> = entries
        .iter()
        .filter(|e| e.permission == permission)
        .cloned()
        .collect();
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    PermissionDetail {
        permission,
        label: permission.label(),
        status: status.clone(),
        metric: metric.clone(),
        history,
    }
}

/// `HH:MM` wall-clock rendering of a millisecond timestamp in `tz`.
pub fn format_clock<Tz>(timestamp: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tz.timestamp_millis_opt(timestamp) {
        chrono::LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        _ => Utc
            .timestamp_millis_opt(timestamp)
            .single()
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string()),
    }
}
