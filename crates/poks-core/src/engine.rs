//! The Installer Orchestrator (§4.8): ties bucket sync, resolution,
//! download, extraction, poking, and env collection together behind
//! a bounded, cancellable worker pool.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use poks_schema::{AppName, AppSelector, AppVersion, Bucket, Config, InstallReport, InstallResult, InstallStatus, Manifest, Version};

use crate::error::PoksError;
use crate::reporter::{NullReporter, Reporter};
use crate::{bucket, env, extract, paths, platform, resolver};

/// Per-process engine over a single root directory. No module-level
/// state: multiple engines over distinct roots may coexist.
pub struct Engine {
    root: PathBuf,
    client: Client,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    parallelism: Option<usize>,
}

impl Engine {
    /// Build an engine rooted at `root_dir`, reporting through a
    /// [`NullReporter`].
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_reporter(root_dir, Arc::new(NullReporter))
    }

    /// Build an engine rooted at `root_dir`, reporting through
    /// `reporter`.
    pub fn with_reporter(root_dir: impl Into<PathBuf>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            root: root_dir.into(),
            client: Client::new(),
            reporter,
            cancel: CancellationToken::new(),
            parallelism: None,
        }
    }

    /// Build an engine from `POKS_ROOT`/`POKS_CACHE_DIR` (the latter
    /// read lazily by [`paths::cache_dir`]), reporting through
    /// `reporter` and capping the worker pool at `POKS_PARALLELISM` if
    /// set (read lazily by [`paths::parallelism`] whenever
    /// `with_parallelism` hasn't overridden it).
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::ConfigInvalid`] if `POKS_ROOT` is unset and
    /// the user's home directory cannot be resolved.
    pub fn from_env(reporter: Arc<dyn Reporter>) -> Result<Self, PoksError> {
        let root = paths::try_root().ok_or_else(|| {
            PoksError::ConfigInvalid(
                "could not determine the Poks root directory; set POKS_ROOT".to_string(),
            )
        })?;
        Ok(Self::with_reporter(root, reporter))
    }

    /// Override the worker-pool cap, superseding `POKS_PARALLELISM`
    /// and the default of one task per logical CPU.
    #[must_use]
    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = Some(n);
        self
    }

    /// Signal cancellation: any app not yet started reports
    /// `skipped-cancelled`; in-flight downloads finish their current
    /// attempt before the next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Install every app declared in `config`, after syncing every
    /// declared bucket.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::ConfigInvalid`] if `config` fails
    /// validation, or [`PoksError::BucketSyncError`] if any declared
    /// bucket fails to sync (a configuration-level failure aborts the
    /// whole run). Per-app failures are captured in that app's
    /// [`InstallResult`] instead of aborting the run.
    pub async fn install(&self, config: &Config) -> Result<InstallReport, PoksError> {
        config
            .validate()
            .map_err(|e| PoksError::ConfigInvalid(e.to_string()))?;
        let buckets = bucket::sync_buckets(&self.root, &config.buckets, &*self.reporter).await?;
        self.run_with_buckets(buckets, &config.apps).await
    }

    /// Install a single app by name, optionally pinning an exact
    /// `version` and a `bucket` (a declared bucket's bare name to
    /// reuse, or a git URL to clone on the fly into a synthetic slot).
    /// With no `bucket`, every bucket already synced under the root is
    /// searched in directory order. With no `version`, the manifest's
    /// highest version (by [`Version`] ordering) is selected.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::ManifestNotFound`], [`PoksError::VersionNotFound`],
    /// or any error from the install pipeline itself.
    pub async fn install_app(
        &self,
        name: &str,
        version: Option<&str>,
        bucket: Option<&str>,
    ) -> Result<InstallReport, PoksError> {
        let buckets = self.resolve_buckets_for_install_app(bucket).await?;

        let manifest_path = match bucket {
            Some(b) if !looks_like_url(b) => bucket::find_manifest(name, &buckets[0].1)?,
            Some(_url) => bucket::find_manifest(name, &buckets[0].1)?,
            None => bucket::find_manifest_in_buckets(name, &buckets, &*self.reporter)?,
        };

        let manifest = read_and_validate_manifest(&manifest_path, name).await?;
        let resolved_version = match version {
            Some(v) => v.to_string(),
            None => latest_version(&manifest).ok_or_else(|| PoksError::VersionNotFound {
                app: name.to_string(),
                version: "<latest>".to_string(),
            })?,
        };

        let owning_bucket = manifest_path
            .parent()
            .and_then(|dir| buckets.iter().find(|(_, d)| d == dir))
            .map(|(n, _)| n.clone());

        let selector = AppSelector {
            name: AppName::new(name),
            version: resolved_version,
            bucket: owning_bucket,
            os: None,
            arch: None,
        };

        self.run_with_buckets(buckets, std::slice::from_ref(&selector))
            .await
    }

    /// Install directly from a manifest file on disk, bypassing
    /// buckets entirely. No bucket side effects.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::VersionNotFound`], [`PoksError::YankedVersion`],
    /// or any error from the install pipeline itself.
    pub async fn install_from_manifest(
        &self,
        manifest_path: &Path,
        version: &str,
    ) -> Result<InstallReport, PoksError> {
        let name = manifest_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        let manifest = read_and_validate_manifest(manifest_path, &name).await?;
        let app_version = manifest
            .find_version(version)
            .ok_or_else(|| PoksError::VersionNotFound {
                app: name.clone(),
                version: version.to_string(),
            })?;
        if let Some(reason) = &app_version.yanked {
            if !reason.is_empty() {
                return Err(PoksError::YankedVersion {
                    app: name.clone(),
                    version: version.to_string(),
                    reason: reason.clone(),
                });
            }
        }

        let ctx = self.make_context().await;
        let install_dir = paths::app_dir(&self.root, &name, version);
        let (status, env_updates) =
            perform_install(&ctx, &name, version, app_version, &manifest, &install_dir).await?;
        ctx.reporter.done(&name, version, status_label(status));

        let result = InstallResult {
            name: AppName::new(&name),
            version: version.to_string(),
            install_dir,
            status,
            error: None,
            env_updates: env_updates.clone(),
        };
        let env = env_updates.unwrap_or_default();
        Ok(InstallReport {
            results: vec![result],
            env,
        })
    }

    async fn resolve_buckets_for_install_app(
        &self,
        bucket: Option<&str>,
    ) -> Result<Vec<(String, PathBuf)>, PoksError> {
        match bucket {
            Some(spec) if looks_like_url(spec) => {
                let name = slugify_url(spec);
                let dir = paths::bucket_dir(&self.root, &name);
                self.reporter.syncing_bucket(&name);
                bucket::sync_one(&name, spec, &dir).await?;
                Ok(vec![(name, dir)])
            }
            Some(name) => Ok(vec![(name.to_string(), paths::bucket_dir(&self.root, name))]),
            None => list_bucket_dirs(&self.root).await,
        }
    }

    async fn make_context(&self) -> Arc<AppContext> {
        let (host_os, host_arch) = platform::detect();
        Arc::new(AppContext {
            root: self.root.clone(),
            client: self.client.clone(),
            reporter: self.reporter.clone(),
            cancel: self.cancel.clone(),
            locks: Mutex::new(HashMap::new()),
            host_os: host_os.as_str().to_string(),
            host_arch: host_arch.as_str().to_string(),
        })
    }

    async fn run_with_buckets(
        &self,
        buckets: Vec<(String, PathBuf)>,
        apps: &[AppSelector],
    ) -> Result<InstallReport, PoksError> {
        let ctx = self.make_context().await;
        let buckets = Arc::new(buckets);
        let semaphore = Arc::new(Semaphore::new(self.parallelism.unwrap_or_else(paths::parallelism)));

        let mut set = tokio::task::JoinSet::new();
        for (idx, selector) in apps.iter().cloned().enumerate() {
            let ctx = ctx.clone();
            let buckets = buckets.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                (idx, install_selector(ctx, selector, buckets).await)
            });
        }

        let mut slots: Vec<Option<InstallResult>> = (0..apps.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (idx, result) =
                joined.map_err(|e| PoksError::IoError(std::io::Error::other(e)))?;
            slots[idx] = Some(result);
        }
        let results: Vec<InstallResult> = slots
            .into_iter()
            .map(|r| r.expect("every index was spawned exactly once"))
            .collect();

        let env_inputs: Vec<BTreeMap<String, String>> =
            results.iter().filter_map(|r| r.env_updates.clone()).collect();
        let reporter = ctx.reporter.clone();
        let env = env::merge_env_updates(&env_inputs, |key, old, new| {
            reporter.warning(&format!(
                "conflicting env value for '{key}': '{old}' overwritten by '{new}'"
            ));
        });

        let installed = results
            .iter()
            .filter(|r| r.status == InstallStatus::Installed)
            .count();
        let skipped = results
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    InstallStatus::SkippedExisting
                        | InstallStatus::SkippedPlatform
                        | InstallStatus::SkippedCancelled
                )
            })
            .count();
        let failed = results.iter().filter(|r| r.status == InstallStatus::Failed).count();
        ctx.reporter.summary(installed, skipped, failed);

        Ok(InstallReport { results, env })
    }

    /// Remove an installed app. See [`crate::manage::uninstall`].
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::ManifestNotFound`] for a missing target
    /// unless `missing_ok` is set.
    pub async fn uninstall(
        &self,
        name: &str,
        version: Option<&str>,
        missing_ok: bool,
    ) -> Result<(), PoksError> {
        crate::manage::uninstall(&self.root, name, version, missing_ok).await
    }

    /// Remove every installed app.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::IoError`] on filesystem failure.
    pub async fn uninstall_all(&self) -> Result<(), PoksError> {
        crate::manage::uninstall_all(&self.root).await
    }

    /// List every installed app version.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::IoError`] or [`PoksError::ManifestInvalid`].
    pub async fn list(&self) -> Result<Vec<poks_schema::InstalledApp>, PoksError> {
        crate::manage::list(&self.root).await
    }

    /// Search every synced bucket for manifests matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::IoError`] on filesystem failure.
    pub async fn search(&self, query: &str) -> Result<Vec<poks_schema::SearchHit>, PoksError> {
        crate::manage::search(&self.root, query).await
    }

    /// Delete every cached archive.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::IoError`] on filesystem failure.
    pub async fn cache_clear(&self) -> Result<(), PoksError> {
        crate::io::download::clear(&paths::cache_dir(&self.root)).await
    }

    /// Total size in bytes of the archive cache.
    ///
    /// # Errors
    ///
    /// Returns [`PoksError::IoError`] on filesystem failure.
    pub async fn cache_size(&self) -> Result<u64, PoksError> {
        crate::io::download::size(&paths::cache_dir(&self.root)).await
    }
}

struct AppContext {
    root: PathBuf,
    client: Client,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    host_os: String,
    host_arch: String,
}

fn status_label(status: InstallStatus) -> &'static str {
    match status {
        InstallStatus::Installed => "installed",
        InstallStatus::SkippedExisting => "skipped-existing",
        InstallStatus::SkippedPlatform => "skipped-platform",
        InstallStatus::SkippedCancelled => "skipped-cancelled",
        InstallStatus::Failed => "failed",
    }
}

async fn install_selector(
    ctx: Arc<AppContext>,
    selector: AppSelector,
    buckets: Arc<Vec<(String, PathBuf)>>,
) -> InstallResult {
    let name = selector.name.to_string();
    let install_dir = paths::app_dir(&ctx.root, &name, &selector.version);

    if ctx.cancel.is_cancelled() {
        ctx.reporter.done(&name, &selector.version, "skipped-cancelled");
        return InstallResult {
            name: selector.name,
            version: selector.version,
            install_dir,
            status: InstallStatus::SkippedCancelled,
            error: None,
            env_updates: None,
        };
    }

    if !selector.admits(&ctx.host_os, &ctx.host_arch) {
        ctx.reporter.done(&name, &selector.version, "skipped-platform");
        return InstallResult {
            name: selector.name,
            version: selector.version,
            install_dir,
            status: InstallStatus::SkippedPlatform,
            error: None,
            env_updates: None,
        };
    }

    match install_selector_inner(&ctx, &selector, &buckets, &install_dir).await {
        Ok((status, env_updates)) => {
            ctx.reporter.done(&name, &selector.version, status_label(status));
            InstallResult {
                name: selector.name,
                version: selector.version,
                install_dir,
                status,
                error: None,
                env_updates,
            }
        }
        Err(err) => {
            ctx.reporter.failed(&name, &selector.version, &err.to_string());
            InstallResult {
                name: selector.name,
                version: selector.version,
                install_dir,
                status: InstallStatus::Failed,
                error: Some(err.to_string()),
                env_updates: None,
            }
        }
    }
}

async fn install_selector_inner(
    ctx: &AppContext,
    selector: &AppSelector,
    buckets: &[(String, PathBuf)],
    install_dir: &Path,
) -> Result<(InstallStatus, Option<BTreeMap<String, String>>), PoksError> {
    let name = selector.name.to_string();

    let manifest_path = match &selector.bucket {
        Some(bucket_name) => {
            let dir = buckets
                .iter()
                .find(|(n, _)| n == bucket_name)
                .map(|(_, d)| d.clone())
                .ok_or_else(|| PoksError::ManifestNotFound {
                    app: name.clone(),
                    searched: vec![bucket_name.clone()],
                })?;
            bucket::find_manifest(&name, &dir)?
        }
        None => bucket::find_manifest_in_buckets(&name, buckets, &ctx.reporter)?,
    };

    let manifest = read_and_validate_manifest(&manifest_path, &name).await?;
    let version = manifest
        .find_version(&selector.version)
        .ok_or_else(|| PoksError::VersionNotFound {
            app: name.clone(),
            version: selector.version.clone(),
        })?;
    if let Some(reason) = &version.yanked {
        if !reason.is_empty() {
            return Err(PoksError::YankedVersion {
                app: name.clone(),
                version: selector.version.clone(),
                reason: reason.clone(),
            });
        }
    }

    perform_install(ctx, &name, &selector.version, version, &manifest, install_dir).await
}

async fn perform_install(
    ctx: &AppContext,
    name: &str,
    requested_version: &str,
    version: &AppVersion,
    manifest: &Manifest,
    install_dir: &Path,
) -> Result<(InstallStatus, Option<BTreeMap<String, String>>), PoksError> {
    let manifest_file = install_dir.join(paths::manifest_file_name());
    if install_dir.is_dir() && manifest_file.is_file() {
        let text = tokio::fs::read_to_string(&manifest_file).await?;
        let persisted: Manifest =
            serde_json::from_str(&text).map_err(|e| PoksError::ManifestInvalid {
                app: name.to_string(),
                reason: e.to_string(),
            })?;
        let persisted_version =
            persisted
                .find_version(requested_version)
                .ok_or_else(|| PoksError::ManifestInvalid {
                    app: name.to_string(),
                    reason: format!("persisted manifest has no version '{requested_version}'"),
                })?;
        let env_updates = env::collect_env_updates(persisted_version, install_dir)?;
        return Ok((InstallStatus::SkippedExisting, Some(env_updates)));
    }

    let archive = resolver::select_archive(name, version, &ctx.host_os, &ctx.host_arch)?;
    let url = resolver::compute_url(version, archive)?;

    let cache_dir = paths::cache_dir(&ctx.root);
    let cache_key = crate::io::download::cache_path(&cache_dir, &url);
    let lock = {
        let mut locks = ctx.locks.lock().await;
        locks
            .entry(cache_key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };
    let _single_flight = lock.lock().await;

    let cached = crate::io::download::get_cached_or_download(
        &ctx.client,
        &url,
        archive.sha256.as_str(),
        &cache_dir,
        name,
        requested_version,
        &ctx.reporter,
    )
    .await?;

    ctx.reporter.extracting(name, requested_version);
    if matches!(extract::detect_format(&cached), Ok(extract::Format::Conda)) {
        ctx.reporter.poking(name, requested_version);
    }
    let staging = install_dir.with_file_name(format!(
        ".{}-staging-{}",
        requested_version,
        std::process::id()
    ));
    if staging.exists() {
        tokio::fs::remove_dir_all(&staging).await?;
    }
    tokio::fs::create_dir_all(&staging).await?;

    let outcome: Result<(), PoksError> = async {
        let runtime_prefix = install_dir.to_string_lossy().into_owned();
        extract::extract_archive(
            &cached,
            &staging,
            version.extract_dir.as_deref(),
            &runtime_prefix,
        )
        .await?;

        let persisted = serde_json::to_string(manifest).map_err(|e| PoksError::ManifestInvalid {
            app: name.to_string(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(staging.join(paths::manifest_file_name()), persisted).await?;
        Ok(())
    }
    .await;

    if let Err(err) = outcome {
        let _ = tokio::fs::remove_dir_all(&staging).await;
        return Err(err);
    }

    if let Some(parent) = install_dir.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if install_dir.exists() {
        tokio::fs::remove_dir_all(install_dir).await?;
    }
    tokio::fs::rename(&staging, install_dir).await?;

    let env_updates = env::collect_env_updates(version, install_dir)?;
    Ok((InstallStatus::Installed, Some(env_updates)))
}

async fn read_and_validate_manifest(manifest_path: &Path, app: &str) -> Result<Manifest, PoksError> {
    let text = tokio::fs::read_to_string(manifest_path)
        .await
        .map_err(|_| PoksError::ManifestNotFound {
            app: app.to_string(),
            searched: vec![manifest_path.display().to_string()],
        })?;
    let manifest = Manifest::parse(&text).map_err(|e| PoksError::ManifestInvalid {
        app: app.to_string(),
        reason: e.to_string(),
    })?;
    manifest.validate().map_err(|e| PoksError::ManifestInvalid {
        app: app.to_string(),
        reason: e.to_string(),
    })?;
    Ok(manifest)
}

fn latest_version(manifest: &Manifest) -> Option<String> {
    manifest
        .versions
        .iter()
        .max_by(|a, b| Version::from(a.version.as_str()).cmp(&Version::from(b.version.as_str())))
        .map(|v| v.version.clone())
}

fn looks_like_url(s: &str) -> bool {
    s.contains("://")
}

fn slugify_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    trimmed
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("bucket")
        .to_string()
}

async fn list_bucket_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>, PoksError> {
    let buckets_dir = paths::buckets_dir(root);
    let mut out = Vec::new();
    if !buckets_dir.is_dir() {
        return Ok(out);
    }
    let mut entries = tokio::fs::read_dir(&buckets_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    Ok(out)
}
