//! `poks uninstall`

use poks_core::{Engine, PoksError};

use crate::split_app_spec;

/// Run the `uninstall` subcommand.
///
/// # Errors
///
/// Returns [`PoksError::ManifestNotFound`] if the target isn't
/// installed and `missing_ok` is unset, or propagates a filesystem
/// error.
pub async fn run(
    engine: &Engine,
    app: Option<String>,
    all: bool,
    missing_ok: bool,
) -> Result<i32, PoksError> {
    if all {
        engine.uninstall_all().await?;
        println!("  all apps removed");
        return Ok(0);
    }

    let spec = app.expect("clap requires an app unless --all is set");
    let (name, version) = split_app_spec(&spec);
    engine.uninstall(name, version, missing_ok).await?;
    println!("  {spec} removed");
    Ok(0)
}
