//! The single owner of dashboard state.
//!
//! [`ApplicationState`] holds the access log, the cached grant statuses and
//! the live/grant inputs. Everything the screens show is derived from it on
//! demand through [`metrics::compute`] and the [`view`] helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::access_log::{AccessLogEntry, AccessLogStore};
use crate::config::DashConfig;
use crate::error::ProbeError;
use crate::metrics::{self, AccessGrants, LiveState, LiveUse, PermissionMetric};
use crate::permission::{PermissionMap, PermissionStatus, PermissionType};
use crate::simulation;
use crate::status::{PermissionProbe, Platform, StatusProvider};
use crate::view::{self, PermissionDetail, StatusTile};

pub struct ApplicationState<P> {
    log: AccessLogStore,
    statuses: PermissionMap<PermissionStatus>,
    live_state: LiveState,
    access_grants: AccessGrants,
    provider: StatusProvider<P>,
}

impl<P: PermissionProbe> ApplicationState<P> {
    /// Empty state: no history, no live use, statuses undetermined until the
    /// first refresh.
    pub fn new(probe: P) -> Self {
        Self {
            log: AccessLogStore::new(),
            statuses: PermissionMap::default(),
            live_state: LiveState::new(),
            access_grants: AccessGrants::new(),
            provider: StatusProvider::new(probe),
        }
    }

    /// Seed the synthetic history, live use and grant registry, then run
    /// the first status refresh.
    pub async fn bootstrap(config: &DashConfig, probe: P, now: i64) -> Self {
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut state = Self::new(probe);
        state.simulate(&mut rng, config, now);
        state.refresh_statuses().await;
        tracing::info!(
            entries = state.log.len(),
            platform = %state.platform(),
            "dashboard state bootstrapped"
        );
        state
    }

    pub fn simulate<R: Rng + ?Sized>(&mut self, rng: &mut R, config: &DashConfig, now: i64) {
        self.log.seed(rng, config.seed_entries, config.seed_window, now);
        self.live_state = simulation::simulate_live_state(rng);
        self.access_grants = simulation::simulate_access_grants(rng);
    }

    /// Re-query every capability and overwrite the cache with the result.
    pub async fn refresh_statuses(&mut self) -> &PermissionMap<PermissionStatus> {
        self.statuses = self.provider.refresh().await;
        &self.statuses
    }

    /// Prompt for one capability and overwrite only its cached status. On
    /// failure the cache is left as it was.
    pub async fn request_permission(
        &mut self,
        permission: PermissionType,
    ) -> Result<PermissionStatus, ProbeError> {
        match self.provider.request(permission).await {
            Ok(status) => {
                self.statuses[permission] = status.clone();
                Ok(status)
            }
            Err(e) => {
                tracing::warn!(%permission, error = %e, "permission request failed; keeping cached status");
                Err(e)
            }
        }
    }

    pub fn record_access(&mut self, entry: AccessLogEntry) {
        self.log.append(entry);
    }

    pub fn set_live_use(&mut self, permission: PermissionType, live: LiveUse) {
        self.live_state.insert(permission, live);
    }

    pub fn set_access_grants(&mut self, permission: PermissionType, apps: Vec<String>) {
        self.access_grants.insert(permission, apps);
    }

    pub fn platform(&self) -> Platform {
        self.provider.platform()
    }

    pub fn statuses(&self) -> &PermissionMap<PermissionStatus> {
        &self.statuses
    }

    pub fn log(&self) -> Vec<AccessLogEntry> {
        self.log.snapshot()
    }

    pub fn metrics(&self, now: i64) -> PermissionMap<PermissionMetric> {
        metrics::compute(&self.log.snapshot(), &self.live_state, &self.access_grants, now)
    }

    pub fn tiles(&self, now: i64) -> Vec<StatusTile> {
        view::tiles(&self.statuses, &self.metrics(now), self.platform())
    }

    pub fn detail(&self, permission: PermissionType, now: i64) -> PermissionDetail {
        let metrics = self.metrics(now);
        view::detail(
            permission,
            &self.statuses[permission],
            &metrics[permission],
            &self.log.entries_for(permission),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::GrantState;
    use crate::status::FixedProbe;

    const NOW: i64 = 1_760_000_000_000;

    fn seeded_config(seed: u64) -> DashConfig {
        DashConfig {
            rng_seed: Some(seed),
            ..DashConfig::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_seeds_and_refreshes() {
        let probe = FixedProbe::all_granted(Platform::Ios);
        let state = ApplicationState::bootstrap(&seeded_config(7), probe, NOW).await;

        assert_eq!(state.log().len(), 15);
        assert_eq!(state.statuses()[PermissionType::Camera].grant, GrantState::Granted);

        let metrics = state.metrics(NOW);
        let total: usize = metrics.iter().map(|(_, m)| m.count_24h).sum();
        assert_eq!(total, 15);
        for (_, metric) in metrics.iter() {
            assert!(metric.access_count >= 1);
            assert_eq!(metric.access_list.len(), metric.access_count);
            assert_eq!(metric.in_use, metric.current_app.is_some());
        }
    }

    #[tokio::test]
    async fn same_seed_same_dashboard() {
        let a = ApplicationState::bootstrap(&seeded_config(99), FixedProbe::new(Platform::Ios), NOW).await;
        let b = ApplicationState::bootstrap(&seeded_config(99), FixedProbe::new(Platform::Ios), NOW).await;
        assert_eq!(a.log(), b.log());
        assert_eq!(a.metrics(NOW), b.metrics(NOW));
    }

    #[tokio::test]
    async fn zero_entries_gives_zero_counts() {
        let config = DashConfig {
            seed_entries: 0,
            ..seeded_config(1)
        };
        let state = ApplicationState::bootstrap(&config, FixedProbe::new(Platform::Ios), NOW).await;
        assert!(state.log().is_empty());
        assert!(state.metrics(NOW).iter().all(|(_, m)| m.count_24h == 0));
    }

    #[tokio::test]
    async fn live_use_shows_on_tile_and_detail() {
        let mut state = ApplicationState::new(FixedProbe::all_granted(Platform::Android));
        state.refresh_statuses().await;
        state.set_live_use(PermissionType::Camera, LiveUse::active("Social Gram"));
        state.record_access(AccessLogEntry::with_id("x", PermissionType::Camera, "Social Gram", NOW - 1_000, 20));

        let tiles = state.tiles(NOW);
        assert_eq!(tiles.len(), 6);
        let camera = tiles.iter().find(|t| t.permission == PermissionType::Camera).unwrap();
        assert!(camera.live);
        assert!(camera.is_granted);
        assert_eq!(camera.count_24h, 1);

        let detail = state.detail(PermissionType::Camera, NOW);
        assert_eq!(detail.history.len(), 1);
        assert_eq!(detail.status_line(), "In use by Social Gram");
    }

    #[tokio::test]
    async fn refresh_overwrites_cache() {
        let mut state = ApplicationState::new(FixedProbe::all_granted(Platform::Ios));
        assert_eq!(state.statuses()[PermissionType::Photos].grant, GrantState::Undetermined);
        let refreshed = state.refresh_statuses().await;
        assert_eq!(refreshed[PermissionType::Photos].grant, GrantState::Granted);
    }

    #[tokio::test]
    async fn request_updates_only_that_status() {
        let probe = FixedProbe::new(Platform::Ios)
            .with(PermissionType::Camera, GrantState::Granted)
            .answering(PermissionType::Calendar, GrantState::Granted);
        let mut state = ApplicationState::new(probe);
        state.refresh_statuses().await;
        let before = state.statuses().clone();

        let status = state.request_permission(PermissionType::Calendar).await.unwrap();
        assert_eq!(status.grant, GrantState::Granted);
        assert_eq!(state.statuses()[PermissionType::Calendar].grant, GrantState::Granted);
        for permission in PermissionType::ALL {
            if permission != PermissionType::Calendar {
                assert_eq!(state.statuses()[permission], before[permission], "{permission}");
            }
        }

        let tile = state
            .tiles(NOW)
            .into_iter()
            .find(|t| t.permission == PermissionType::Calendar)
            .unwrap();
        assert!(tile.is_granted);
    }

    #[tokio::test]
    async fn failed_request_keeps_cached_status() {
        let probe = FixedProbe::all_granted(Platform::Ios).failing(PermissionType::Photos);
        let mut state = ApplicationState::new(probe);
        state.refresh_statuses().await;
        let before = state.statuses().clone();

        assert!(state.request_permission(PermissionType::Photos).await.is_err());
        assert_eq!(state.statuses(), &before);
    }

    #[tokio::test]
    async fn request_tracking_off_ios_fails() {
        let mut state = ApplicationState::new(FixedProbe::all_granted(Platform::Android));
        let err = state.request_permission(PermissionType::Tracking).await.unwrap_err();
        assert_eq!(err, ProbeError::Unavailable(PermissionType::Tracking));
        assert_eq!(state.statuses()[PermissionType::Tracking].grant, GrantState::Undetermined);
    }

    #[test]
    fn grants_override_is_reflected_in_metrics() {
        let mut state = ApplicationState::new(FixedProbe::new(Platform::Ios));
        state.set_access_grants(PermissionType::Contacts, vec!["Chat App".into()]);
        let metrics = state.metrics(NOW);
        assert_eq!(metrics[PermissionType::Contacts].access_list, vec!["Chat App"]);
        assert_eq!(metrics[PermissionType::Contacts].access_count, 1);
    }
}
