//! poks - a user-space package manager for pre-built developer tools.
//!
//! This crate is a thin dispatcher: every subcommand parses its
//! arguments, builds a [`poks_core::Engine`], calls exactly one engine
//! method, and renders the result. All install/uninstall/search/list
//! logic lives in `poks-core`.
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
/// Console [`poks_core::Reporter`] implementation.
pub mod reporter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "poks")]
#[command(author, version, about = "poks - a user-space package manager for pre-built developer tools")]
pub struct Cli {
    /// Override the Poks root directory.
    #[arg(long, global = true, env = "POKS_ROOT")]
    pub root: Option<PathBuf>,

    /// Disable colored/styled output.
    #[arg(long, global = true, env = "POKS_NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install apps from a config file, or a single app by name.
    Install {
        /// Path to a `poks.json` config file.
        #[arg(short, long, conflicts_with_all = ["app", "manifest"])]
        config: Option<PathBuf>,

        /// `name` or `name@version` to install a single app.
        #[arg(conflicts_with_all = ["config", "manifest"])]
        app: Option<String>,

        /// Bucket to search for `app` (bare name, or a git URL to clone on the fly).
        #[arg(long, requires = "app")]
        bucket: Option<String>,

        /// Install directly from a manifest file on disk, bypassing buckets.
        #[arg(long, requires = "version", conflicts_with_all = ["config", "app"])]
        manifest: Option<PathBuf>,

        /// The exact version to install (required with `--manifest`).
        #[arg(long)]
        version: Option<String>,
    },

    /// Remove an installed app, or every installed app.
    Uninstall {
        /// `name` or `name@version` to remove.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        app: Option<String>,

        /// Remove every installed app.
        #[arg(long)]
        all: bool,

        /// Don't fail if the target isn't installed.
        #[arg(long)]
        missing_ok: bool,
    },

    /// Search every synced bucket for manifests matching a query.
    Search {
        /// Search query, matched against app names and descriptions.
        query: String,
    },

    /// List every installed app version.
    List,

    /// Inspect or clear the archive download cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// `poks cache` subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Delete every cached archive.
    Clear,
    /// Print the total size of the archive cache, in bytes.
    Size,
}

/// Split an `app` or `app@version` spec into its parts.
pub fn split_app_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('@') {
        Some((name, version)) => (name, Some(version)),
        None => (spec, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_app_spec_separates_name_and_version() {
        assert_eq!(split_app_spec("jq@1.7"), ("jq", Some("1.7")));
        assert_eq!(split_app_spec("jq"), ("jq", None));
    }
}
