//! Uninstall, list, and search (§4.9): operations over what's already
//! on disk, independent of the install pipeline.

use poks_schema::{AppName, InstalledApp, Manifest, SearchHit};

use crate::error::PoksError;
use crate::paths;

/// Remove an installed app. If `version` is set, only that version is
/// removed (and the now-empty `apps/<name>/` is cleaned up too); if
/// unset, every version is removed. Removing a target that doesn't
/// exist is an error unless `missing_ok` is set.
///
/// # Errors
///
/// Returns [`PoksError::ManifestNotFound`] for a missing target when
/// `missing_ok` is `false`, or [`PoksError::IoError`] on filesystem
/// failure.
pub async fn uninstall(
    root: &std::path::Path,
    name: &str,
    version: Option<&str>,
    missing_ok: bool,
) -> Result<(), PoksError> {
    match version {
        Some(version) => {
            let dir = paths::app_dir(root, name, version);
            if !dir.exists() {
                return missing_or_err(missing_ok, name, version);
            }
            tokio::fs::remove_dir_all(&dir).await?;

            let name_dir = paths::app_name_dir(root, name);
            if name_dir.is_dir() && is_empty_dir(&name_dir).await? {
                tokio::fs::remove_dir(&name_dir).await?;
            }
        }
        None => {
            let dir = paths::app_name_dir(root, name);
            if !dir.exists() {
                return missing_or_err(missing_ok, name, "*");
            }
            tokio::fs::remove_dir_all(&dir).await?;
        }
    }
    Ok(())
}

fn missing_or_err(missing_ok: bool, name: &str, version: &str) -> Result<(), PoksError> {
    if missing_ok {
        Ok(())
    } else {
        Err(PoksError::ManifestNotFound {
            app: name.to_string(),
            searched: vec![format!("apps/{name}/{version}")],
        })
    }
}

async fn is_empty_dir(dir: &std::path::Path) -> Result<bool, PoksError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

/// Remove every installed app.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure.
pub async fn uninstall_all(root: &std::path::Path) -> Result<(), PoksError> {
    let dir = paths::apps_dir(root);
    if dir.exists() {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}

/// List every installed app version that carries a persisted
/// `.manifest.json`.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure or
/// [`PoksError::ManifestInvalid`] if a persisted manifest is
/// malformed.
pub async fn list(root: &std::path::Path) -> Result<Vec<InstalledApp>, PoksError> {
    let apps_dir = paths::apps_dir(root);
    let mut installed = Vec::new();
    if !apps_dir.is_dir() {
        return Ok(installed);
    }

    let mut name_entries = tokio::fs::read_dir(&apps_dir).await?;
    while let Some(name_entry) = name_entries.next_entry().await? {
        if !name_entry.file_type().await?.is_dir() {
            continue;
        }
        let name = name_entry.file_name().to_string_lossy().into_owned();

        let mut version_entries = tokio::fs::read_dir(name_entry.path()).await?;
        while let Some(version_entry) = version_entries.next_entry().await? {
            if !version_entry.file_type().await?.is_dir() {
                continue;
            }
            let install_dir = version_entry.path();
            let manifest_path = install_dir.join(paths::manifest_file_name());
            if !manifest_path.is_file() {
                continue;
            }
            let version_string = version_entry.file_name().to_string_lossy().into_owned();

            let text = tokio::fs::read_to_string(&manifest_path).await?;
            let persisted: Manifest =
                serde_json::from_str(&text).map_err(|err| PoksError::ManifestInvalid {
                    app: name.clone(),
                    reason: err.to_string(),
                })?;
            let version = persisted.find_version(&version_string).ok_or_else(|| {
                PoksError::ManifestInvalid {
                    app: name.clone(),
                    reason: format!("persisted manifest has no version '{version_string}'"),
                }
            })?;

            let bin_dirs = version
                .bin
                .as_ref()
                .map(|entries| entries.iter().map(|b| install_dir.join(b)).collect())
                .unwrap_or_default();

            installed.push(InstalledApp {
                name: AppName::new(&name),
                version: version.version.clone(),
                install_dir,
                bin_dirs,
                env: version.env.clone().unwrap_or_default(),
            });
        }
    }
    Ok(installed)
}

/// Scan `buckets/*/*.json` for manifests whose name contains `query`
/// (case-insensitive substring).
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure. Malformed
/// manifests are skipped rather than failing the whole search.
pub async fn search(root: &std::path::Path, query: &str) -> Result<Vec<SearchHit>, PoksError> {
    let buckets_dir = paths::buckets_dir(root);
    let query = query.to_lowercase();
    let mut hits = Vec::new();
    if !buckets_dir.is_dir() {
        return Ok(hits);
    }

    let mut bucket_entries = tokio::fs::read_dir(&buckets_dir).await?;
    while let Some(bucket_entry) = bucket_entries.next_entry().await? {
        if !bucket_entry.file_type().await?.is_dir() {
            continue;
        }
        let bucket_name = bucket_entry.file_name().to_string_lossy().into_owned();

        let mut manifest_entries = tokio::fs::read_dir(bucket_entry.path()).await?;
        while let Some(manifest_entry) = manifest_entries.next_entry().await? {
            let path = manifest_entry.path();
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| n.ends_with(".json"))
                .map(|n| n.trim_end_matches(".json").to_string())
            else {
                continue;
            };
            if !stem.to_lowercase().contains(&query) {
                continue;
            }
            let Ok(text) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(manifest) = Manifest::parse(&text) else {
                continue;
            };
            hits.push(SearchHit {
                bucket: bucket_name.clone(),
                name: AppName::new(&stem),
                versions: manifest.versions.iter().map(|v| v.version.clone()).collect(),
                description: manifest.description,
            });
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poks_schema::AppVersion;

    fn write_manifest(path: &std::path::Path, version: &AppVersion) {
        let manifest = Manifest {
            description: "a test app".into(),
            versions: vec![version.clone()],
            schema_version: "1.0.0".into(),
            license: None,
            homepage: None,
            extra: serde_json::Map::new(),
        };
        std::fs::write(path, serde_json::to_string(&manifest).unwrap()).unwrap();
    }

    fn app_version(v: &str) -> AppVersion {
        serde_json::from_value(serde_json::json!({
            "version": v,
            "archives": [],
            "bin": ["bin"],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn uninstall_removes_version_and_empty_parent() {
        let root = tempfile::tempdir().unwrap();
        let dir = paths::app_dir(root.path(), "foo", "1.0.0");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        uninstall(root.path(), "foo", Some("1.0.0"), false).await.unwrap();

        assert!(!dir.exists());
        assert!(!paths::app_name_dir(root.path(), "foo").exists());
    }

    #[tokio::test]
    async fn uninstall_missing_target_errors_without_missing_ok() {
        let root = tempfile::tempdir().unwrap();
        let err = uninstall(root.path(), "foo", Some("1.0.0"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PoksError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn uninstall_missing_target_is_ok_with_missing_ok() {
        let root = tempfile::tempdir().unwrap();
        uninstall(root.path(), "foo", Some("1.0.0"), true).await.unwrap();
    }

    #[tokio::test]
    async fn list_yields_apps_with_persisted_manifest() {
        let root = tempfile::tempdir().unwrap();
        let dir = paths::app_dir(root.path(), "foo", "1.0.0");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        write_manifest(&dir.join(paths::manifest_file_name()), &app_version("1.0.0"));

        let installed = list(root.path()).await.unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].version, "1.0.0");
        assert_eq!(installed[0].bin_dirs, vec![dir.join("bin")]);
    }

    #[tokio::test]
    async fn list_skips_versions_without_persisted_manifest() {
        let root = tempfile::tempdir().unwrap();
        let dir = paths::app_dir(root.path(), "foo", "1.0.0");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let installed = list(root.path()).await.unwrap();
        assert!(installed.is_empty());
    }

    #[tokio::test]
    async fn search_matches_case_insensitive_substring_on_app_name() {
        let root = tempfile::tempdir().unwrap();
        let bucket_dir = paths::bucket_dir(root.path(), "main");
        tokio::fs::create_dir_all(&bucket_dir).await.unwrap();
        let manifest = Manifest {
            description: "a foo tool".into(),
            versions: vec![app_version("1.0.0")],
            schema_version: "1.0.0".into(),
            license: None,
            homepage: None,
            extra: serde_json::Map::new(),
        };
        tokio::fs::write(
            bucket_dir.join("FooTool.json"),
            serde_json::to_string(&manifest).unwrap(),
        )
        .await
        .unwrap();

        let hits = search(root.path(), "ootoo").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bucket, "main");
        assert_eq!(hits[0].versions, vec!["1.0.0".to_string()]);
    }
}
