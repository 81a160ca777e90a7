use std::path::PathBuf;

use thiserror::Error;

/// The engine's error taxonomy (§7). Every variant carries enough
/// context for diagnosis: URL, file, expected vs. actual hash,
/// missing variable name, etc.
#[derive(Debug, Error)]
pub enum PoksError {
    /// The config file was malformed or violated an invariant.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// `git clone`/`git pull` failed for a bucket.
    #[error("bucket sync failed for '{bucket}': {stderr}")]
    BucketSyncError {
        /// The bucket name.
        bucket: String,
        /// Captured stderr from the git subprocess.
        stderr: String,
    },

    /// No `<app>.json` was found in the searched bucket(s).
    #[error("manifest not found for app '{app}' (searched buckets: {searched:?})")]
    ManifestNotFound {
        /// The app name that was searched for.
        app: String,
        /// The bucket names that were searched.
        searched: Vec<String>,
    },

    /// The manifest was malformed or violated a data-model invariant.
    #[error("invalid manifest for '{app}': {reason}")]
    ManifestInvalid {
        /// The app name whose manifest failed validation.
        app: String,
        /// The validation failure description.
        reason: String,
    },

    /// The requested exact version string wasn't in the manifest.
    #[error("version '{version}' not found for app '{app}'")]
    VersionNotFound {
        /// The app name.
        app: String,
        /// The requested version string.
        version: String,
    },

    /// The requested version exists but is yanked.
    #[error("version '{version}' of app '{app}' is yanked: {reason}")]
    YankedVersion {
        /// The app name.
        app: String,
        /// The yanked version string.
        version: String,
        /// The yank reason.
        reason: String,
    },

    /// No archive matched the host `(os, arch)`.
    #[error("no archive for app '{app}' version '{version}' matches {os}/{arch}")]
    UnsupportedPlatform {
        /// The app name.
        app: String,
        /// The version string.
        version: String,
        /// Host OS token.
        os: String,
        /// Host arch token.
        arch: String,
    },

    /// A `${name}` placeholder had no matching value in the mapping.
    #[error("unresolved variable '${{{name}}}' in template '{template}'")]
    VariableUnresolved {
        /// The unresolved placeholder name.
        name: String,
        /// The template string it appeared in.
        template: String,
    },

    /// A non-retryable HTTP status was returned.
    #[error("http error {status} fetching {url}")]
    HttpError {
        /// The HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// The downloaded content's SHA-256 didn't match the manifest.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The expected (manifest) digest.
        expected: String,
        /// The actual computed digest.
        actual: String,
        /// The archive URL.
        url: String,
    },

    /// The archive's extension has no known extractor.
    #[error("unsupported archive extension: {0}")]
    UnsupportedArchive(String),

    /// An archive member's path escaped `dest_dir`.
    #[error("unsafe archive member path: {0}")]
    UnsafeArchive(PathBuf),

    /// `extract_dir` named a directory that did not exist post-extract.
    #[error("extract_dir '{0}' not found after extraction")]
    ExtractDirNotFound(String),

    /// A binary-mode prefix patch's install path was longer than the
    /// placeholder it replaces.
    #[error(
        "install path too long to patch '{file}': install path is {install_len} bytes, placeholder is {placeholder_len} bytes"
    )]
    PrefixTooLong {
        /// The file being patched.
        file: PathBuf,
        /// Length in bytes of the install path.
        install_len: usize,
        /// Length in bytes of the placeholder being replaced.
        placeholder_len: usize,
    },

    /// Any filesystem I/O failure not covered by a more specific
    /// variant above.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PoksError {
    /// The CLI exit code this error kind maps to (§6.5).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigInvalid(_) => 2,
            Self::ManifestNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::ExtractDirNotFound(_) => 3,
            Self::ChecksumMismatch { .. } => 4,
            Self::HttpError { .. } | Self::BucketSyncError { .. } => 5,
            _ => 1,
        }
    }
}
