//! Shared utilities for the onboarding workspace.
//!
//! Holds build metadata so the service binary and its health check report
//! the same version string.

pub mod version_info;
