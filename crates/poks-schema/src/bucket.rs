use serde::{Deserialize, Serialize};

use crate::names::AppName;

/// A git repository holding manifest files, one per app, referenced by
/// a stable local handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Stable local handle; must be filesystem-safe (used as the
    /// directory name under `buckets/`).
    pub name: String,
    /// Git repository URL (any scheme `git` supports, including
    /// `file://`).
    pub url: String,
}

/// A request to install a specific app version, optionally restricted
/// to a bucket and/or a set of platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSelector {
    /// The app name (matches the manifest's `<name>.json` filename).
    pub name: AppName,
    /// The exact version string to install.
    pub version: String,
    /// The bucket to search. If absent, all local buckets are
    /// searched in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// If present, this selector only applies on these OS tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,
    /// If present, this selector only applies on these arch tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Vec<String>>,
}

impl AppSelector {
    /// Whether this selector's OS/arch filters admit the given host
    /// platform. An absent filter means "any".
    pub fn admits(&self, host_os: &str, host_arch: &str) -> bool {
        let os_ok = self
            .os
            .as_ref()
            .is_none_or(|list| list.iter().any(|o| o.eq_ignore_ascii_case(host_os)));
        let arch_ok = self
            .arch
            .as_ref()
            .is_none_or(|list| list.iter().any(|a| a.eq_ignore_ascii_case(host_arch)));
        os_ok && arch_ok
    }
}
