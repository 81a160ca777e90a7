use std::path::{Path, PathBuf};

/// Resolves the Poks root directory, or `None` if the user's home
/// directory cannot be resolved and `POKS_ROOT` isn't set.
pub fn try_root() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("POKS_ROOT") {
        return Some(PathBuf::from(val));
    }
    dirs::home_dir().map(|h| h.join(".poks"))
}

/// Resolves the Poks root directory (`~/.poks`, or `$POKS_ROOT`).
///
/// # Panics
///
/// Panics if neither `POKS_ROOT` is set nor the user's home directory
/// can be resolved.
pub fn root() -> PathBuf {
    try_root().expect("could not determine home directory; set POKS_ROOT to override")
}

/// `apps/<name>/<version>/` under a root.
pub fn app_dir(root: &Path, name: &str, version: &str) -> PathBuf {
    root.join("apps").join(name).join(version)
}

/// `apps/<name>/` under a root.
pub fn app_name_dir(root: &Path, name: &str) -> PathBuf {
    root.join("apps").join(name)
}

/// `apps/` under a root.
pub fn apps_dir(root: &Path) -> PathBuf {
    root.join("apps")
}

/// `buckets/<name>/` under a root.
pub fn bucket_dir(root: &Path, name: &str) -> PathBuf {
    root.join("buckets").join(name)
}

/// `buckets/` under a root.
pub fn buckets_dir(root: &Path) -> PathBuf {
    root.join("buckets")
}

/// The content-addressed cache directory, honoring `POKS_CACHE_DIR`.
pub fn cache_dir(root: &Path) -> PathBuf {
    std::env::var("POKS_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| root.join("cache"))
}

/// The persisted-manifest filename inside an app's install directory.
pub fn manifest_file_name() -> &'static str {
    ".manifest.json"
}

/// Extract the filename from a URL, stripping any query string.
pub fn filename_from_url(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query.split('/').next_back().unwrap_or("")
}

/// Worker-pool size: `POKS_PARALLELISM` if set and parseable,
/// otherwise the number of logical CPUs.
pub fn parallelism() -> usize {
    std::env::var("POKS_PARALLELISM")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or_else(num_cpus::get)
}
