// src/config.rs
// =============================================================================
// Resolved run settings.
//
// cli.rs knows about flags; everything else in the program only sees the
// plain values collected here. Settings is built once in main and passed
// around by reference.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT_DIR: &str = "./mp3";
pub const DEFAULT_LOG_FILE: &str = "./tunnel_downloader.log";
pub const DEFAULT_PACKAGES: &str = ".env";

/// What the pool does once one of its tasks has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep going; every task runs and the failure is recorded in the report
    #[default]
    Continue,
    /// Stop handing out new tasks after the first failure. In-flight tasks
    /// still finish; tasks that never started are reported as skipped.
    Abort,
}

/// Options applied to every request made through a Fetcher.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Accept any TLS certificate. Off unless the operator asks for it.
    pub accept_invalid_certs: bool,
    /// Whole-request timeout. None means no limit, which long streams need.
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub environment: Option<PathBuf>,
    pub packages: PathBuf,
    pub failure_policy: FailurePolicy,
    pub fetch: FetchOptions,
    pub log_file: PathBuf,
    pub debug: bool,
    pub json: bool,
}

/// Worker count used when none is given: one per processing unit.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
