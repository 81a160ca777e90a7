use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::names::AppName;

/// The outcome of attempting to install a single `AppSelector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStatus {
    /// A fresh install completed successfully.
    Installed,
    /// `apps/<name>/<version>/` already existed with a
    /// `.manifest.json`; nothing was done.
    SkippedExisting,
    /// The selector's OS/arch filters excluded the host.
    SkippedPlatform,
    /// Cancellation was signaled before this app started.
    SkippedCancelled,
    /// Any step of the install failed; see `error`.
    Failed,
}

/// Per-app install outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    /// The app name.
    pub name: AppName,
    /// The version requested.
    pub version: String,
    /// `apps/<name>/<version>/`, whether or not the install
    /// succeeded.
    pub install_dir: PathBuf,
    /// Final status of this app's install attempt.
    pub status: InstallStatus,
    /// Rendered error message, present only when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Environment updates contributed by this app, present for
    /// `Installed` and `SkippedExisting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_updates: Option<BTreeMap<String, String>>,
}

/// The aggregate outcome of an `install` or `install_app` call: one
/// result per app plus the merged environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    /// Per-app results, in config declaration order.
    pub results: Vec<InstallResult>,
    /// The merged environment across all successfully-installed or
    /// already-installed apps.
    pub env: BTreeMap<String, String>,
}

/// A single `apps/<name>/<version>/` entry as surfaced by `list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    /// The app name.
    pub name: AppName,
    /// The installed version.
    pub version: String,
    /// The install directory.
    pub install_dir: PathBuf,
    /// Resolved `bin` directories (absolute paths).
    pub bin_dirs: Vec<PathBuf>,
    /// The app's `env` contributions (unexpanded key/value pairs as
    /// they appear in the persisted manifest).
    pub env: BTreeMap<String, String>,
}

/// A single manifest hit as surfaced by `search()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The bucket the manifest was found in.
    pub bucket: String,
    /// The app name.
    pub name: AppName,
    /// All version strings published by this manifest.
    pub versions: Vec<String>,
    /// The manifest's description.
    pub description: String,
}
