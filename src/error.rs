use thiserror::Error;

use crate::permission::PermissionType;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("Unknown permission '{0}'. Run `privacy-dash types` to see available permissions.")]
    UnknownPermission(String),

    #[error("Unknown platform '{0}' (expected ios, android or other)")]
    UnknownPlatform(String),

    #[error("Failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Failure of a single platform capability query.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    #[error("{0} API is not available on this platform")]
    Unavailable(PermissionType),

    #[error("location services query failed: {0}")]
    LocationServices(String),

    #[error("{permission} query failed: {message}")]
    QueryFailed {
        permission: PermissionType,
        message: String,
    },
}
