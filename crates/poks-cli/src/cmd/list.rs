//! `poks list`

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

use poks_core::{Engine, PoksError};

/// Run the `list` subcommand.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] or [`PoksError::ManifestInvalid`].
pub async fn run(engine: &Engine) -> Result<i32, PoksError> {
    let apps = engine.list().await?;

    if apps.is_empty() {
        println!();
        println!("  No apps installed.");
        println!("  Run 'poks install <app>' to get started.");
        return Ok(0);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["name", "version", "install dir"]);
    for app in &apps {
        table.add_row(vec![
            app.name.to_string(),
            app.version.clone(),
            app.install_dir.display().to_string(),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} app{}", apps.len(), if apps.len() == 1 { "" } else { "s" });
    Ok(0)
}
