//! Shared domain types and wire format for the Poks package manager.
//!
//! This crate defines the canonical data structures used by the engine
//! (`poks-core`) and its CLI front-end (`poks-cli`): bucket and app
//! selectors, archive and manifest records, the config file shape, and
//! the aggregate install result. Nothing in this crate performs I/O;
//! it is pure data plus validation.

/// Newtypes for app names, versions, and SHA-256 digests.
pub mod names;
/// Canonical OS/arch tokens (Platform Detector's vocabulary).
pub mod platform;
/// Bucket and app-selector records.
pub mod bucket;
/// Archive, app-version, and manifest records.
pub mod manifest;
/// Config file (`poks.json`) record.
pub mod config;
/// Aggregate install result types.
pub mod result;
/// Validation error types shared by the types above.
pub mod error;

pub use bucket::{AppSelector, Bucket};
pub use config::Config;
pub use error::ManifestError;
pub use manifest::{Archive, AppVersion, Manifest};
pub use names::{AppName, Sha256, Version};
pub use platform::{Arch, Os};
pub use result::{InstallReport, InstallResult, InstallStatus, InstalledApp, SearchHit};
