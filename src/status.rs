//! Grant-status refresh across every capability.
//!
//! [`StatusProvider::refresh`] fans out one query per [`PermissionType`] and
//! joins them before returning, so callers never see a half-updated map. A
//! failing query only affects its own capability, which falls back to
//! [`GrantState::Undetermined`].
//!
//! [`StatusProvider::request`] asks for a single capability instead. Unlike
//! a refresh it reports failures to the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{DashError, ProbeError};
use crate::permission::{GrantState, PermissionMap, PermissionStatus, PermissionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
    Other,
}

impl Platform {
    pub fn supports(self, permission: PermissionType) -> bool {
        !permission.requires_ios() || self == Platform::Ios
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "other" | "web" => Ok(Platform::Other),
            _ => Err(DashError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Source of capability answers. Implemented over the OS permission APIs in
/// an app, and by [`FixedProbe`] for the terminal demo and tests.
#[async_trait]
pub trait PermissionProbe: Send + Sync {
    fn platform(&self) -> Platform;

    async fn grant_state(&self, permission: PermissionType) -> Result<GrantState, ProbeError>;

    async fn location_services_enabled(&self) -> Result<bool, ProbeError>;

    /// Prompt for a capability and return the resulting grant. Already
    /// decided capabilities return their current state without prompting.
    async fn request(&self, permission: PermissionType) -> Result<GrantState, ProbeError>;
}

pub struct StatusProvider<P> {
    probe: P,
}

impl<P: PermissionProbe> StatusProvider<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn platform(&self) -> Platform {
        self.probe.platform()
    }

    pub async fn refresh(&self) -> PermissionMap<PermissionStatus> {
        let queries = PermissionType::ALL.map(|permission| self.query(permission));
        let results = futures::future::join_all(queries).await;

        let mut statuses: PermissionMap<PermissionStatus> = PermissionMap::default();
        for (permission, status) in PermissionType::ALL.into_iter().zip(results) {
            statuses[permission] = status;
        }
        tracing::debug!(platform = %self.platform(), "permission statuses refreshed");
        statuses
    }

    async fn query(&self, permission: PermissionType) -> PermissionStatus {
        if !self.platform().supports(permission) {
            return PermissionStatus::new(GrantState::Undetermined);
        }

        if permission == PermissionType::Location {
            let (grant, services) = futures::join!(
                self.probe.grant_state(permission),
                self.probe.location_services_enabled()
            );
            let enabled = services.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "location services query failed; reporting disabled");
                false
            });
            return PermissionStatus::location(absorb(permission, grant), enabled);
        }

        PermissionStatus::new(absorb(permission, self.probe.grant_state(permission).await))
    }

    pub async fn request(&self, permission: PermissionType) -> Result<PermissionStatus, ProbeError> {
        if !self.platform().supports(permission) {
            return Err(ProbeError::Unavailable(permission));
        }

        if permission == PermissionType::Location {
            let (grant, services) = futures::join!(
                self.probe.request(permission),
                self.probe.location_services_enabled()
            );
            let enabled = services.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "location services query failed; reporting disabled");
                false
            });
            return Ok(PermissionStatus::location(grant?, enabled));
        }

        let grant = self.probe.request(permission).await?;
        tracing::debug!(%permission, %grant, "permission requested");
        Ok(PermissionStatus::new(grant))
    }
}

fn absorb(permission: PermissionType, result: Result<GrantState, ProbeError>) -> GrantState {
    result.unwrap_or_else(|e| {
        tracing::warn!(%permission, error = %e, "permission query failed; reporting undetermined");
        GrantState::Undetermined
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Probe with fixed answers. Unlisted capabilities report `undetermined`.
///
/// A request moves an `undetermined` capability to the answer configured
/// with [`FixedProbe::answering`], and later queries see the new state.
pub struct FixedProbe {
    platform: Platform,
    grants: Mutex<HashMap<PermissionType, GrantState>>,
    answers: HashMap<PermissionType, GrantState>,
    failing: HashSet<PermissionType>,
    services_enabled: Result<bool, ProbeError>,
    queried: Mutex<Vec<PermissionType>>,
}

impl FixedProbe {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            grants: Mutex::new(HashMap::new()),
            answers: HashMap::new(),
            failing: HashSet::new(),
            services_enabled: Ok(true),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn all_granted(platform: Platform) -> Self {
        PermissionType::ALL
            .into_iter()
            .fold(Self::new(platform), |probe, p| probe.with(p, GrantState::Granted))
    }

    pub fn with(mut self, permission: PermissionType, grant: GrantState) -> Self {
        self.grants
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(permission, grant);
        self
    }

    /// Grant the user gives when prompted for an undetermined capability.
    pub fn answering(mut self, permission: PermissionType, grant: GrantState) -> Self {
        self.answers.insert(permission, grant);
        self
    }

    pub fn failing(mut self, permission: PermissionType) -> Self {
        self.failing.insert(permission);
        self
    }

    pub fn services_enabled(mut self, enabled: bool) -> Self {
        self.services_enabled = Ok(enabled);
        self
    }

    pub fn services_failing(mut self) -> Self {
        self.services_enabled = Err(ProbeError::LocationServices("provider unavailable".into()));
        self
    }

    /// Capabilities whose grant state has been asked for, in call order.
    pub fn queried(&self) -> Vec<PermissionType> {
        lock(&self.queried).clone()
    }
}

#[async_trait]
impl PermissionProbe for FixedProbe {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn grant_state(&self, permission: PermissionType) -> Result<GrantState, ProbeError> {
        lock(&self.queried).push(permission);

        if self.failing.contains(&permission) {
            return Err(ProbeError::Unavailable(permission));
        }
        Ok(lock(&self.grants).get(&permission).copied().unwrap_or_default())
    }

    async fn location_services_enabled(&self) -> Result<bool, ProbeError> {
        self.services_enabled.clone()
    }

    async fn request(&self, permission: PermissionType) -> Result<GrantState, ProbeError> {
        if self.failing.contains(&permission) {
            return Err(ProbeError::QueryFailed {
                permission,
                message: "request was not presented".into(),
            });
        }

        let mut grants = lock(&self.grants);
        let current = grants.get(&permission).copied().unwrap_or_default();
        match (current, self.answers.get(&permission)) {
            (GrantState::Undetermined, Some(&answer)) => {
                grants.insert(permission, answer);
                Ok(answer)
            }
            (current, _) => Ok(current),
        }
    }
}
