use thiserror::Error;

/// Errors raised while validating a parsed manifest or config against
/// the invariants in the data model (non-empty `versions`, unique
/// `(os, arch)` pairs, etc).
#[derive(Debug, Error)]
pub enum ManifestError {
    /// `AppVersion.archives` was empty.
    #[error("manifest invalid: version {version} has no archives")]
    EmptyArchives {
        /// The offending version string.
        version: String,
    },

    /// The same `(os, arch)` pair appeared more than once in one version.
    #[error("manifest invalid: version {version} has duplicate archive for {os}/{arch}")]
    DuplicateArchive {
        /// The offending version string.
        version: String,
        /// Operating system token.
        os: String,
        /// Architecture token.
        arch: String,
    },

    /// Neither the archive nor the URL template named an extension.
    #[error("manifest invalid: version {version} archive for {os}/{arch} has no ext and no url")]
    MissingExt {
        /// The offending version string.
        version: String,
        /// Operating system token.
        os: String,
        /// Architecture token.
        arch: String,
    },

    /// `Manifest.versions` was empty.
    #[error("manifest invalid: no versions declared")]
    EmptyVersions,

    /// Two versions in a manifest shared the same `version` string.
    #[error("manifest invalid: duplicate version {version}")]
    DuplicateVersion {
        /// The duplicated version string.
        version: String,
    },

    /// `Config.buckets` had two entries with the same name.
    #[error("config invalid: duplicate bucket name {name}")]
    DuplicateBucket {
        /// The duplicated bucket name.
        name: String,
    },

    /// An `AppSelector.bucket` referenced a bucket name not declared
    /// in `Config.buckets`.
    #[error("config invalid: app {app} references undeclared bucket {bucket}")]
    UndeclaredBucket {
        /// The app name whose selector references the bucket.
        app: String,
        /// The undeclared bucket name.
        bucket: String,
    },

    /// JSON parsing failed.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
