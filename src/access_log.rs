//! In-memory access log of which app touched which capability, and when.

use chrono::TimeDelta;
use rand::Rng;
use serde::Serialize;

use crate::permission::PermissionType;

/// Apps the simulated log attributes accesses to.
pub const MOCK_APPS: &[&str] = &[
    "Social Gram",
    "Map Guide",
    "Voice Note",
    "Browser",
    "Camera App",
    "Chat App",
    "Fitness Tracker",
];

/// Capabilities the simulated log draws from.
pub const LOG_TYPES: &[PermissionType] = &PermissionType::ALL;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;
const MIN_DURATION_SEC: u32 = 5;
const MAX_DURATION_SEC: u32 = 65;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLogEntry {
    pub id: String,
    pub permission: PermissionType,
    pub app_name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub duration_sec: u32,
}

impl AccessLogEntry {
    pub fn new(
        permission: PermissionType,
        app_name: impl Into<String>,
        timestamp: i64,
        duration_sec: u32,
    ) -> Self {
        Self::with_id(random_id(&mut rand::rng()), permission, app_name, timestamp, duration_sec)
    }

    /// Zero durations are clamped to one second; stored durations are always positive.
    pub fn with_id(
        id: impl Into<String>,
        permission: PermissionType,
        app_name: impl Into<String>,
        timestamp: i64,
        duration_sec: u32,
    ) -> Self {
        Self {
            id: id.into(),
            permission,
            app_name: app_name.into(),
            timestamp,
            duration_sec: duration_sec.max(1),
        }
    }
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Append-only store. Entries keep insertion order internally; readers get
/// them newest first.
#[derive(Debug, Clone, Default)]
pub struct AccessLogStore {
    entries: Vec<AccessLogEntry>,
}

impl AccessLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<R: Rng + ?Sized>(rng: &mut R, count: usize, window: TimeDelta, now: i64) -> Self {
        let mut store = Self::new();
        store.seed(rng, count, window, now);
        store
    }

    /// Generate `count` synthetic entries spread over `[now - window, now]`
    /// and append them. Returns the generated entries, newest first.
    pub fn seed<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        count: usize,
        window: TimeDelta,
        now: i64,
    ) -> Vec<AccessLogEntry> {
        let window_ms = window.num_milliseconds().max(0);
        let mut generated: Vec<AccessLogEntry> = (0..count)
            .map(|_| AccessLogEntry {
                id: random_id(rng),
                permission: LOG_TYPES[rng.random_range(0..LOG_TYPES.len())],
                app_name: MOCK_APPS[rng.random_range(0..MOCK_APPS.len())].to_string(),
                timestamp: now - rng.random_range(0..=window_ms),
                duration_sec: rng.random_range(MIN_DURATION_SEC..MAX_DURATION_SEC),
            })
            .collect();
        sort_newest_first(&mut generated);

        tracing::debug!(count, window_ms, "seeded access log");
        self.entries.extend(generated.iter().cloned());
        generated
    }

    pub fn append(&mut self, entry: AccessLogEntry) {
        tracing::trace!(id = %entry.id, permission = %entry.permission, app = %entry.app_name, "access recorded");
        self.entries.push(entry);
    }

    pub fn snapshot(&self) -> Vec<AccessLogEntry> {
        let mut entries = self.entries.clone();
        sort_newest_first(&mut entries);
        entries
    }

    pub fn entries_for(&self, permission: PermissionType) -> Vec<AccessLogEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.permission == permission)
            .cloned()
            .collect();
        sort_newest_first(&mut entries);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sort_newest_first(entries: &mut [AccessLogEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
