//! `poks cache clear|size`

use poks_core::{Engine, PoksError};

use crate::CacheCommands;

/// Run the `cache` subcommand.
///
/// # Errors
///
/// Returns [`PoksError::IoError`] on filesystem failure.
pub async fn run(engine: &Engine, command: CacheCommands) -> Result<i32, PoksError> {
    match command {
        CacheCommands::Clear => {
            engine.cache_clear().await?;
            println!("  cache cleared");
        }
        CacheCommands::Size => {
            let bytes = engine.cache_size().await?;
            println!("  {bytes} bytes");
        }
    }
    Ok(0)
}
