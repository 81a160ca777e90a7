//! poks - a user-space package manager for pre-built developer tools.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use poks_cli::reporter::ConsoleReporter;
use poks_cli::{Cli, Commands, cmd};
use poks_core::{Engine, PoksError};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let reporter = Arc::new(ConsoleReporter::new(!cli.no_color));
    let engine = match cli.root {
        Some(root) => Engine::with_reporter(root, reporter),
        None => match Engine::from_env(reporter) {
            Ok(engine) => engine,
            Err(err) => {
                eprintln!("poks: {err}; pass --root or set POKS_ROOT");
                return ExitCode::from(2);
            }
        },
    };

    match dispatch(&engine, cli.command).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("poks: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn dispatch(engine: &Engine, command: Commands) -> Result<i32, PoksError> {
    match command {
        Commands::Install {
            config,
            app,
            bucket,
            manifest,
            version,
        } => cmd::install::run(engine, config, app, bucket, manifest, version).await,
        Commands::Uninstall {
            app,
            all,
            missing_ok,
        } => cmd::uninstall::run(engine, app, all, missing_ok).await,
        Commands::Search { query } => cmd::search::run(engine, &query).await,
        Commands::List => cmd::list::run(engine).await,
        Commands::Cache { command } => cmd::cache::run(engine, command).await,
    }
}
