//! IO modules - side effects (network, filesystem)

/// HTTP fetch with progress, SHA-256 verification, and a
/// content-addressed cache.
pub mod download;
