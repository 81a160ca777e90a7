use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::PoksError;
use crate::paths;
use crate::reporter::Reporter;

/// Sync every declared bucket into `root/buckets/<name>/`: clone if
/// missing, fast-forward pull if present. Returns `(name,
/// local_path)` pairs in the same order the buckets were declared —
/// lookups that fall back across buckets (§4.3) depend on this order.
///
/// # Errors
///
/// Returns [`PoksError::BucketSyncError`] with the git subprocess's
/// captured stderr on a non-zero exit.
pub async fn sync_buckets(
    root: &Path,
    buckets: &[poks_schema::Bucket],
    reporter: &(impl Reporter + ?Sized),
) -> Result<Vec<(String, PathBuf)>, PoksError> {
    let mut out = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        reporter.syncing_bucket(&bucket.name);
        let dir = paths::bucket_dir(root, &bucket.name);
        sync_one(&bucket.name, &bucket.url, &dir).await?;
        out.push((bucket.name.clone(), dir));
    }
    Ok(out)
}

/// Sync a single bucket directory, cloning it on the fly if it
/// doesn't exist under `dir` yet.
///
/// # Errors
///
/// Returns [`PoksError::BucketSyncError`] on a non-zero git exit.
pub async fn sync_one(name: &str, url: &str, dir: &Path) -> Result<(), PoksError> {
    if dir.join(".git").exists() {
        run_git(name, &["-C", dir_str(dir), "pull", "--ff-only"]).await
    } else {
        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        run_git(name, &["clone", "--depth", "1", url, dir_str(dir)]).await
    }
}

fn dir_str(dir: &Path) -> &str {
    dir.to_str().unwrap_or_default()
}

async fn run_git(bucket: &str, args: &[&str]) -> Result<(), PoksError> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(|e| PoksError::BucketSyncError {
            bucket: bucket.to_string(),
            stderr: e.to_string(),
        })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PoksError::BucketSyncError {
            bucket: bucket.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Return `bucket_dir/<app_name>.json` if it exists.
///
/// # Errors
///
/// Returns [`PoksError::ManifestNotFound`] otherwise.
pub fn find_manifest(app_name: &str, bucket_dir: &Path) -> Result<PathBuf, PoksError> {
    let candidate = bucket_dir.join(format!("{app_name}.json"));
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(PoksError::ManifestNotFound {
            app: app_name.to_string(),
            searched: vec![bucket_dir.display().to_string()],
        })
    }
}

/// Search buckets in declaration order for `<app_name>.json`,
/// returning the first hit. If more than one bucket contains the
/// name, a warning is logged naming both but the first is still
/// returned (see `DESIGN.md`'s Open Question decision).
///
/// # Errors
///
/// Returns [`PoksError::ManifestNotFound`] listing every bucket
/// searched when no bucket contains the manifest.
pub fn find_manifest_in_buckets(
    app_name: &str,
    buckets: &[(String, PathBuf)],
    reporter: &(impl Reporter + ?Sized),
) -> Result<PathBuf, PoksError> {
    let mut hit: Option<(&str, PathBuf)> = None;
    for (name, dir) in buckets {
        let candidate = dir.join(format!("{app_name}.json"));
        if candidate.is_file() {
            match &hit {
                None => hit = Some((name.as_str(), candidate)),
                Some((first, _)) => {
                    reporter.warning(&format!(
                        "app '{app_name}' found in both bucket '{first}' and bucket '{name}'; using '{first}'"
                    ));
                }
            }
        }
    }
    hit.map(|(_, path)| path).ok_or_else(|| PoksError::ManifestNotFound {
        app: app_name.to_string(),
        searched: buckets.iter().map(|(name, _)| name.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;

    #[test]
    fn find_manifest_missing_lists_bucket_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_manifest("foo", dir.path()).unwrap_err();
        assert!(matches!(err, PoksError::ManifestNotFound { .. }));
    }

    #[test]
    fn find_manifest_hits_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.json"), "{}").unwrap();
        let found = find_manifest("foo", dir.path()).unwrap();
        assert_eq!(found, dir.path().join("foo.json"));
    }

    #[test]
    fn find_manifest_in_buckets_prefers_first_declared() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join("foo.json"), "{\"bucket\":\"a\"}").unwrap();
        std::fs::write(b.path().join("foo.json"), "{\"bucket\":\"b\"}").unwrap();
        let buckets = vec![
            ("a".to_string(), a.path().to_path_buf()),
            ("b".to_string(), b.path().to_path_buf()),
        ];
        let found = find_manifest_in_buckets("foo", &buckets, &NullReporter).unwrap();
        assert_eq!(found, a.path().join("foo.json"));
    }

    #[test]
    fn find_manifest_in_buckets_reports_all_searched_on_miss() {
        let buckets: Vec<(String, PathBuf)> = vec![];
        let err = find_manifest_in_buckets("foo", &buckets, &NullReporter).unwrap_err();
        match err {
            PoksError::ManifestNotFound { searched, .. } => assert!(searched.is_empty()),
            _ => panic!("expected ManifestNotFound"),
        }
    }
}
