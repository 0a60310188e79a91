//! Device descriptor, battery and accelerometer feeds.
//!
//! Platform callbacks are delivered through an [`EventHub`]. Each
//! [`Subscription`] stays live until it is cancelled or dropped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default accelerometer update interval.
pub const DEFAULT_SENSOR_INTERVAL: Duration = Duration::from_millis(500);

/// Battery percentage at or below which a discharging battery counts as low.
pub const LOW_BATTERY_PERCENT: u8 = 20;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DeviceInfo {
    pub model_name: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub brand: Option<String>,
    pub manufacturer: Option<String>,
    pub design_name: Option<String>,
    pub product_name: Option<String>,
    /// Bytes.
    pub total_memory: Option<u64>,
    pub is_device: bool,
}

impl DeviceInfo {
    pub fn display_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or("Unknown Device")
    }

    pub fn memory_label(&self) -> String {
        match self.total_memory {
            Some(bytes) if bytes > 0 => format!("{:.1} GB", bytes as f64 / BYTES_PER_GB),
            _ => "Unknown".to_string(),
        }
    }

    pub fn os_label(&self) -> String {
        join_present(&[self.os_name.as_deref(), self.os_version.as_deref()])
    }

    pub fn hardware_label(&self) -> String {
        join_present(&[self.brand.as_deref(), self.design_name.as_deref()])
    }

    pub fn product_label(&self) -> String {
        join_present(&[self.manufacturer.as_deref(), self.product_name.as_deref()])
    }

    /// Whether the readings come from real hardware or an emulator.
    pub fn kind_label(&self) -> &'static str {
        if self.is_device { "Physical device" } else { "Simulator" }
    }
}

fn join_present(parts: &[Option<&str>]) -> String {
    parts.iter().flatten().copied().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeState {
    #[default]
    Unknown,
    Unplugged,
    Charging,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BatteryEvent {
    Level(f32),
    State(ChargeState),
    LowPowerMode(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BatterySnapshot {
    /// 0.0 to 1.0, `None` until the first reading arrives.
    pub level: Option<f32>,
    pub state: ChargeState,
    pub low_power_mode: bool,
}

impl BatterySnapshot {
    pub fn percentage(&self) -> u8 {
        self.level
            .map(|level| (level.clamp(0.0, 1.0) * 100.0).round() as u8)
            .unwrap_or(0)
    }

    pub fn is_charging(&self) -> bool {
        matches!(self.state, ChargeState::Charging | ChargeState::Full)
    }

    pub fn is_low(&self) -> bool {
        !self.is_charging() && self.percentage() <= LOW_BATTERY_PERCENT
    }

    pub fn charge_label(&self) -> &'static str {
        if self.is_charging() { "Charging" } else { "Discharging" }
    }

    pub fn mode_label(&self) -> &'static str {
        if self.low_power_mode {
            "Low Power Mode: On"
        } else {
            "Performance Mode"
        }
    }

    pub fn apply(&mut self, event: BatteryEvent) {
        match event {
            BatteryEvent::Level(level) => self.level = Some(level),
            BatteryEvent::State(state) => self.state = state,
            BatteryEvent::LowPowerMode(on) => self.low_power_mode = on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn axes(&self) -> [(&'static str, String); 3] {
        [
            ("X", format!("{:.2}", self.x)),
            ("Y", format!("{:.2}", self.y)),
            ("Z", format!("{:.2}", self.z)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorReading {
    pub available: bool,
    pub sample: AccelSample,
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct HubInner<T> {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler<T>>>,
}

impl<T> HubInner<T> {
    fn handlers(&self) -> MutexGuard<'_, BTreeMap<u64, Handler<T>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fan-out point for one upstream callback stream.
pub struct EventHub<T> {
    inner: Arc<HubInner<T>>,
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> EventHub<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(0),
                handlers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    #[must_use = "dropping a Subscription cancels it"]
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers().insert(id, Arc::new(handler));

        let inner = Arc::downgrade(&self.inner);
        Subscription {
            cancelled: AtomicBool::new(false),
            detach: Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.handlers().remove(&id);
                }
            }),
        }
    }

    /// Deliver `event` to every live handler, once each.
    pub fn publish(&self, event: &T) {
        // Handlers run outside the lock so they may subscribe or cancel.
        let handlers: Vec<Handler<T>> = self.inner.handlers().values().cloned().collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers().len()
    }
}

pub struct Subscription {
    cancelled: AtomicBool,
    detach: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Stop receiving events. Safe to call more than once.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            (self.detach)();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Keeps a merged [`BatterySnapshot`] current from battery events.
pub struct BatteryMonitor {
    snapshot: Arc<Mutex<BatterySnapshot>>,
    subscription: Subscription,
}

impl BatteryMonitor {
    pub fn attach(initial: BatterySnapshot, events: &EventHub<BatteryEvent>) -> Self {
        let snapshot = Arc::new(Mutex::new(initial));
        let target = Arc::clone(&snapshot);
        let subscription = events.subscribe(move |event| {
            target.lock().unwrap_or_else(PoisonError::into_inner).apply(*event);
        });
        Self {
            snapshot,
            subscription,
        }
    }

    pub fn snapshot(&self) -> BatterySnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn detach(&self) {
        self.subscription.cancel();
    }
}

/// Accelerometer stream with its configured sampling interval.
pub struct SensorFeed {
    available: bool,
    interval: Duration,
    latest: Arc<Mutex<AccelSample>>,
    samples: EventHub<AccelSample>,
}

impl SensorFeed {
    pub fn new(available: bool, interval: Duration) -> Self {
        Self {
            available,
            interval,
            latest: Arc::new(Mutex::new(AccelSample::default())),
            samples: EventHub::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Called by the platform layer for each new sample.
    pub fn push(&self, sample: AccelSample) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = sample;
        self.samples.publish(&sample);
    }

    pub fn subscribe(&self, handler: impl Fn(&AccelSample) + Send + Sync + 'static) -> Subscription {
        self.samples.subscribe(handler)
    }

    pub fn reading(&self) -> SensorReading {
        SensorReading {
            available: self.available,
            sample: *self.latest.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl Default for SensorFeed {
    fn default() -> Self {
        Self::new(false, DEFAULT_SENSOR_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_hub() -> (EventHub<u32>, Arc<AtomicUsize>) {
        (EventHub::new(), Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn each_publish_reaches_each_handler_once() {
        let (hub, calls) = counter_hub();
        let c1 = Arc::clone(&calls);
        let c2 = Arc::clone(&calls);
        let _a = hub.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let _b = hub.subscribe(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        hub.publish(&1);
        hub.publish(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn cancel_is_idempotent_and_stops_delivery() {
        let (hub, calls) = counter_hub();
        let c = Arc::clone(&calls);
        let sub = hub.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        hub.publish(&1);
        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());
        hub.publish(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let (hub, _) = counter_hub();
        {
            let _sub = hub.subscribe(|_| {});
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn cancel_after_hub_dropped_is_harmless() {
        let (hub, _) = counter_hub();
        let sub = hub.subscribe(|_| {});
        drop(hub);
        sub.cancel();
        assert!(sub.is_cancelled());
    }

    #[test]
    fn battery_monitor_merges_events() {
        let hub = EventHub::new();
        let monitor = BatteryMonitor::attach(BatterySnapshot::default(), &hub);

        hub.publish(&BatteryEvent::Level(0.42));
        hub.publish(&BatteryEvent::State(ChargeState::Charging));
        hub.publish(&BatteryEvent::LowPowerMode(true));

        let snap = monitor.snapshot();
        assert_eq!(snap.percentage(), 42);
        assert!(snap.is_charging());
        assert_eq!(snap.mode_label(), "Low Power Mode: On");

        monitor.detach();
        hub.publish(&BatteryEvent::Level(0.10));
        assert_eq!(monitor.snapshot().percentage(), 42);
    }

    #[test]
    fn battery_labels() {
        let low = BatterySnapshot {
            level: Some(0.15),
            state: ChargeState::Unplugged,
            low_power_mode: false,
        };
        assert!(low.is_low());
        assert_eq!(low.charge_label(), "Discharging");
        assert_eq!(low.mode_label(), "Performance Mode");

        let full = BatterySnapshot {
            level: Some(1.0),
            state: ChargeState::Full,
            low_power_mode: false,
        };
        assert!(full.is_charging());
        assert!(!full.is_low());
        assert_eq!(full.percentage(), 100);

        assert_eq!(BatterySnapshot::default().percentage(), 0);
    }

    #[test]
    fn device_labels() {
        let info = DeviceInfo {
            model_name: Some("Pixel 8".into()),
            os_name: Some("Android".into()),
            os_version: Some("15".into()),
            brand: Some("google".into()),
            total_memory: Some(8 * 1024 * 1024 * 1024),
            ..DeviceInfo::default()
        };
        assert_eq!(info.display_name(), "Pixel 8");
        assert_eq!(info.memory_label(), "8.0 GB");
        assert_eq!(info.os_label(), "Android 15");
        assert_eq!(info.hardware_label(), "google");
        assert_eq!(info.product_label(), "");

        let full = DeviceInfo {
            manufacturer: Some("Google".into()),
            product_name: Some("shiba".into()),
            is_device: true,
            ..info
        };
        assert_eq!(full.product_label(), "Google shiba");
        assert_eq!(full.kind_label(), "Physical device");

        let unknown = DeviceInfo::default();
        assert_eq!(unknown.display_name(), "Unknown Device");
        assert_eq!(unknown.memory_label(), "Unknown");
        assert_eq!(unknown.kind_label(), "Simulator");
    }

    #[test]
    fn sensor_feed_tracks_latest_sample() {
        let feed = SensorFeed::new(true, DEFAULT_SENSOR_INTERVAL);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = feed.subscribe(move |s| sink.lock().unwrap().push(*s));

        feed.push(AccelSample { x: 0.1, y: -0.2, z: 0.98 });
        feed.push(AccelSample { x: 0.0, y: 0.0, z: 1.0 });

        let reading = feed.reading();
        assert!(reading.available);
        assert_eq!(reading.sample.z, 1.0);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(feed.interval(), Duration::from_millis(500));
    }

    #[test]
    fn accel_axes_format_two_decimals() {
        let sample = AccelSample { x: 0.123, y: -1.0, z: 9.8 };
        let axes = sample.axes();
        assert_eq!(axes[0], ("X", "0.12".to_string()));
        assert_eq!(axes[1].1, "-1.00");
        assert_eq!(axes[2].1, "9.80");
    }
}
