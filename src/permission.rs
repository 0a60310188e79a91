//! The closed set of tracked capabilities and a total map keyed by it.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::DashError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Camera,
    Microphone,
    Location,
    Contacts,
    Calendar,
    Photos,
    Tracking,
}

impl PermissionType {
    pub const ALL: [PermissionType; 7] = [
        PermissionType::Camera,
        PermissionType::Microphone,
        PermissionType::Location,
        PermissionType::Contacts,
        PermissionType::Calendar,
        PermissionType::Photos,
        PermissionType::Tracking,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PermissionType::Camera => "camera",
            PermissionType::Microphone => "microphone",
            PermissionType::Location => "location",
            PermissionType::Contacts => "contacts",
            PermissionType::Calendar => "calendar",
            PermissionType::Photos => "photos",
            PermissionType::Tracking => "tracking",
        }
    }

    /// Heading used on the detail screen.
    pub fn label(self) -> &'static str {
        match self {
            PermissionType::Camera => "Camera",
            PermissionType::Microphone => "Microphone",
            PermissionType::Location => "Location",
            PermissionType::Contacts => "Contacts",
            PermissionType::Calendar => "Calendar",
            PermissionType::Photos => "Photos",
            PermissionType::Tracking => "Tracking",
        }
    }

    /// Shorter label that fits a dashboard tile.
    pub fn tile_label(self) -> &'static str {
        match self {
            PermissionType::Microphone => "Mic",
            other => other.label(),
        }
    }

    /// Only iOS exposes an app tracking transparency API.
    pub fn requires_ios(self) -> bool {
        self == PermissionType::Tracking
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PermissionType {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        PermissionType::ALL
            .into_iter()
            .find(|p| p.key() == input || p.label().to_lowercase() == input)
            .or(match input.as_str() {
                "mic" => Some(PermissionType::Microphone),
                "media" => Some(PermissionType::Photos),
                _ => None,
            })
            .ok_or_else(|| DashError::UnknownPermission(s.to_string()))
    }
}

/// Grant decision recorded by the OS for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantState {
    Granted,
    Denied,
    #[default]
    Undetermined,
    Restricted,
}

impl fmt::Display for GrantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GrantState::Granted => "granted",
            GrantState::Denied => "denied",
            GrantState::Undetermined => "undetermined",
            GrantState::Restricted => "restricted",
        };
        f.write_str(s)
    }
}

/// Cached status of one capability. `service_enabled` is only reported for
/// location, where the OS-wide service switch is independent of the grant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PermissionStatus {
    pub grant: GrantState,
    pub service_enabled: Option<bool>,
}

impl PermissionStatus {
    pub fn new(grant: GrantState) -> Self {
        Self {
            grant,
            service_enabled: None,
        }
    }

    pub fn location(grant: GrantState, service_enabled: bool) -> Self {
        Self {
            grant,
            service_enabled: Some(service_enabled),
        }
    }
}

/// A mapping with exactly one value per [`PermissionType`].
///
/// Lookups are total: indexing can never miss, and iteration always yields
/// the closed set in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMap<T> {
    values: [T; 7],
}

impl<T> PermissionMap<T> {
    pub fn from_fn(mut f: impl FnMut(PermissionType) -> T) -> Self {
        Self {
            values: PermissionType::ALL.map(&mut f),
        }
    }

    pub fn get(&self, permission: PermissionType) -> &T {
        &self.values[permission.index()]
    }

    pub fn get_mut(&mut self, permission: PermissionType) -> &mut T {
        &mut self.values[permission.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionType, &T)> {
        PermissionType::ALL.into_iter().zip(self.values.iter())
    }

    pub fn keys(&self) -> impl Iterator<Item = PermissionType> {
        PermissionType::ALL.into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(PermissionType, &T) -> U) -> PermissionMap<U> {
        PermissionMap::from_fn(|p| f(p, self.get(p)))
    }
}

impl<T: Default> Default for PermissionMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<PermissionType> for PermissionMap<T> {
    type Output = T;

    fn index(&self, permission: PermissionType) -> &T {
        self.get(permission)
    }
}

impl<T> IndexMut<PermissionType> for PermissionMap<T> {
    fn index_mut(&mut self, permission: PermissionType) -> &mut T {
        self.get_mut(permission)
    }
}

impl<T: Serialize> Serialize for PermissionMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (permission, value) in self.iter() {
            map.serialize_entry(permission.key(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_each_variant_once_in_declaration_order() {
        for (i, p) in PermissionType::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn parse_accepts_key_label_and_aliases() {
        assert_eq!("camera".parse::<PermissionType>().unwrap(), PermissionType::Camera);
        assert_eq!("Microphone".parse::<PermissionType>().unwrap(), PermissionType::Microphone);
        assert_eq!(" TRACKING ".parse::<PermissionType>().unwrap(), PermissionType::Tracking);
        assert_eq!("mic".parse::<PermissionType>().unwrap(), PermissionType::Microphone);
        assert_eq!("media".parse::<PermissionType>().unwrap(), PermissionType::Photos);
    }

    #[test]
    fn parse_unknown_is_error() {
        let err = "bluetooth".parse::<PermissionType>().unwrap_err();
        assert!(matches!(err, DashError::UnknownPermission(ref s) if s == "bluetooth"));
    }

    #[test]
    fn tile_label_shortens_microphone_only() {
        assert_eq!(PermissionType::Microphone.tile_label(), "Mic");
        assert_eq!(PermissionType::Photos.tile_label(), "Photos");
    }

    #[test]
    fn only_tracking_requires_ios() {
        let ios_only: Vec<_> = PermissionType::ALL
            .into_iter()
            .filter(|p| p.requires_ios())
            .collect();
        assert_eq!(ios_only, vec![PermissionType::Tracking]);
    }

    #[test]
    fn map_default_and_index_mut() {
        let mut counts: PermissionMap<u32> = PermissionMap::default();
        counts[PermissionType::Photos] += 3;
        assert_eq!(counts[PermissionType::Photos], 3);
        assert_eq!(counts.iter().filter(|(_, v)| **v == 0).count(), 6);
        assert_eq!(counts.keys().count(), 7);
    }

    #[test]
    fn map_serializes_as_object_keyed_by_lowercase_name() {
        let map = PermissionMap::from_fn(|p| p.label());
        let value = serde_json::to_value(&map).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 7);
        assert_eq!(obj["microphone"], "Microphone");
        assert_eq!(obj["tracking"], "Tracking");
    }

    #[test]
    fn status_serializes_grant_lowercase() {
        let status = PermissionStatus::location(GrantState::Granted, false);
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["grant"], "granted");
        assert_eq!(value["service_enabled"], false);
        let plain = serde_json::to_value(PermissionStatus::default()).unwrap();
        assert!(plain["service_enabled"].is_null());
        assert_eq!(plain["grant"], "undetermined");
    }
}
