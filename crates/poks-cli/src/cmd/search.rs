//! `poks search`

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use crossterm::style::Stylize;

use poks_core::{Engine, PoksError};

/// Run the `search` subcommand.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure.
pub async fn run(engine: &Engine, query: &str) -> Result<i32, PoksError> {
    let hits = engine.search(query).await?;

    if hits.is_empty() {
        println!();
        println!("  {} no apps found matching '{}'", "i".blue(), query);
        return Ok(0);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["bucket", "name", "versions", "description"]);
    for hit in &hits {
        table.add_row(vec![
            hit.bucket.clone(),
            hit.name.to_string(),
            hit.versions.join(", "),
            hit.description.clone(),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    let plural = if hits.len() == 1 { "" } else { "s" };
    println!("  {} result{plural}", hits.len());
    Ok(0)
}
