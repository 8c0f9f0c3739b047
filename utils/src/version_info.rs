//! Build metadata, captured by `build.rs`.
//!
//! The version label depends on where the service runs:
//! - Prod: `stable:{version}`
//! - Internal: `internal:{commit}`
//! - Test/Local: `main:{commit}`

use std::fmt::Display;

/// Environment the service was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Local,
    Test,
    Internal,
    Prod,
}

/// Build date in RFC3339 format.
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Short git commit hash, or `unknown` outside a checkout.
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

/// Git branch the binary was built from.
pub fn build_branch() -> &'static str {
    env!("BUILD_BRANCH")
}

pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Version label reported in the `x-service-version` header.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
        RuntimeEnv::Internal => format!("internal:{}", build_commit()),
        RuntimeEnv::Test | RuntimeEnv::Local => format!("main:{}", build_commit()),
    }
}

/// Snapshot of all build metadata, for startup logging.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub date: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
    pub version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            date: build_date(),
            commit: build_commit(),
            branch: build_branch(),
            version: build_version(),
        }
    }
}

impl Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}@{}, built {})",
            self.version, self.commit, self.branch, self.date
        )
    }
}
