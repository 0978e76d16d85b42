//! Capability wrappers for desk-agent: files, processes, telemetry,
//! network, archives, crypto and desktop helpers.

pub mod os_capabilities;
pub mod sandbox;

pub use os_capabilities::{OsError, OsResult};
pub use sandbox::PathGuard;
