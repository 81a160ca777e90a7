//! `poks install`

use std::path::PathBuf;

use poks_core::{Engine, PoksError};
use poks_schema::{Config, InstallReport, InstallStatus};

use crate::split_app_spec;

/// Run the `install` subcommand. Exactly one of `config`, `app`, or
/// `manifest` must be set; `clap`'s `conflicts_with`/`requires`
/// constraints on [`crate::Commands::Install`] enforce that for any
/// CLI-driven call, so only the programmatic "none given" case is
/// checked here.
///
/// # Errors
///
/// Returns [`PoksError::ConfigInvalid`] if none of `config`/`app`/
/// `manifest` is set, or propagates whatever `poks_core::Engine`
/// returns for a configuration-level failure. Per-app failures are
/// captured in the returned exit code instead of as an `Err`.
pub async fn run(
    engine: &Engine,
    config: Option<PathBuf>,
    app: Option<String>,
    bucket: Option<String>,
    manifest: Option<PathBuf>,
    version: Option<String>,
) -> Result<i32, PoksError> {
    let report = if let Some(path) = config {
        let text = std::fs::read_to_string(&path)?;
        let cfg = Config::parse(&text).map_err(|e| PoksError::ConfigInvalid(e.to_string()))?;
        engine.install(&cfg).await?
    } else if let Some(path) = manifest {
        let version = version.expect("clap requires --version alongside --manifest");
        engine.install_from_manifest(&path, &version).await?
    } else if let Some(spec) = app {
        let (name, inline_version) = split_app_spec(&spec);
        let resolved_version = version.as_deref().or(inline_version);
        engine.install_app(name, resolved_version, bucket.as_deref()).await?
    } else {
        return Err(PoksError::ConfigInvalid(
            "install requires --config, an app name, or --manifest".to_string(),
        ));
    };

    print_env(&report);
    Ok(exit_code(&report))
}

fn print_env(report: &InstallReport) {
    if report.env.is_empty() {
        return;
    }
    println!();
    println!("  environment:");
    for (key, value) in &report.env {
        println!("    {key}={value}");
    }
}

fn exit_code(report: &InstallReport) -> i32 {
    if report
        .results
        .iter()
        .any(|r| r.status == InstallStatus::Failed)
    {
        1
    } else {
        0
    }
}
