//! Subcommand implementations. Each module owns exactly one
//! subcommand's argument handling and output rendering; all the real
//! work happens inside `poks_core::Engine`.

pub mod cache;
pub mod install;
pub mod list;
pub mod search;
pub mod uninstall;
