//! Privacy dashboard core.
//!
//! Turns grant statuses and an access-log stream into per-permission
//! metrics ([`metrics::compute`]) and the tile/detail state the screens
//! render ([`view`]). [`state::ApplicationState`] ties the pieces together.

pub mod access_log;
pub mod config;
pub mod device;
pub mod error;
pub mod metrics;
pub mod permission;
pub mod simulation;
pub mod state;
pub mod status;
pub mod view;
