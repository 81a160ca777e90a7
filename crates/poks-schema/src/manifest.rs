use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;
use crate::names::Sha256;

/// A single downloadable artifact for a specific `(os, arch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    /// Canonical OS token (`windows`, `linux`, `macos`).
    pub os: String,
    /// Canonical arch token (`x86_64`, `aarch64`, extensible).
    pub arch: String,
    /// SHA-256 of the archive content, validated at deserialization.
    pub sha256: Sha256,
    /// File extension driving format detection / generic-URL
    /// expansion. May be omitted only when `url` is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    /// Per-archive URL override. When present it takes priority over
    /// the version-level URL template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One version entry in a manifest: its archives, extraction options,
/// and environment contributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersion {
    /// The exact version string (matched literally, no ranges).
    pub version: String,
    /// Per-platform archives. Invariant: non-empty, and each
    /// `(os, arch)` pair appears at most once.
    pub archives: Vec<Archive>,
    /// Top-level directory inside the archive whose contents should
    /// be flattened to the install root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<String>,
    /// Relative paths (from the install dir) to prepend to `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<Vec<String>>,
    /// Extra environment variables, values may reference `${dir}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<std::collections::BTreeMap<String, String>>,
    /// SPDX-ish license identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Non-empty reason string when this version is yanked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yanked: Option<String>,
    /// Version-level URL template containing `${version}`, `${os}`,
    /// `${arch}`, `${ext}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Unknown fields are preserved for forward-compatible
    /// re-serialization rather than silently dropped.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppVersion {
    /// Validate this version's invariants (non-empty archives, unique
    /// `(os, arch)` pairs, `ext` present somewhere when needed).
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] describing the first violated
    /// invariant.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.archives.is_empty() {
            return Err(ManifestError::EmptyArchives {
                version: self.version.clone(),
            });
        }
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for archive in &self.archives {
            let key = (archive.os.as_str(), archive.arch.as_str());
            if !seen.insert(key) {
                return Err(ManifestError::DuplicateArchive {
                    version: self.version.clone(),
                    os: archive.os.clone(),
                    arch: archive.arch.clone(),
                });
            }
            if archive.ext.is_none() && archive.url.is_none() && self.url.is_none() {
                return Err(ManifestError::MissingExt {
                    version: self.version.clone(),
                    os: archive.os.clone(),
                    arch: archive.arch.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find the archive matching a host `(os, arch)` pair, returning
    /// the first match in insertion order (selection is deterministic).
    pub fn archive_for(&self, os: &str, arch: &str) -> Option<&Archive> {
        self.archives
            .iter()
            .find(|a| a.os == os && a.arch == arch)
    }
}

/// An app's manifest: its description and the versions it publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Human-readable description.
    pub description: String,
    /// Published versions. Invariant: non-empty, `version` strings
    /// unique within the manifest.
    pub versions: Vec<AppVersion>,
    /// Manifest schema version; defaults to `"1.0.0"` when absent.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// SPDX-ish license identifier for the app as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Project homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Unknown fields are preserved for forward-compatible
    /// re-serialization rather than silently dropped.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_schema_version() -> String {
    "1.0.0".to_string()
}

impl Manifest {
    /// Parse a manifest from JSON text without validating invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError::Json`] on malformed JSON.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate this manifest's invariants: non-empty `versions`,
    /// unique version strings, and each version's own invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] describing the first violated
    /// invariant.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.versions.is_empty() {
            return Err(ManifestError::EmptyVersions);
        }
        let mut seen = HashSet::new();
        for version in &self.versions {
            if !seen.insert(version.version.as_str()) {
                return Err(ManifestError::DuplicateVersion {
                    version: version.version.clone(),
                });
            }
            version.validate()?;
        }
        Ok(())
    }

    /// Find a version by its exact version string.
    pub fn find_version(&self, version: &str) -> Option<&AppVersion> {
        self.versions.iter().find(|v| v.version == version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(os: &str, arch: &str) -> Archive {
        Archive {
            os: os.into(),
            arch: arch.into(),
            sha256: Sha256::new("a".repeat(64)).unwrap(),
            ext: Some(".tar.gz".into()),
            url: None,
        }
    }

    fn version(v: &str, archives: Vec<Archive>) -> AppVersion {
        AppVersion {
            version: v.into(),
            archives,
            extract_dir: None,
            bin: None,
            env: None,
            license: None,
            yanked: None,
            url: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn empty_archives_is_invalid() {
        let v = version("1.0.0", vec![]);
        assert!(matches!(
            v.validate(),
            Err(ManifestError::EmptyArchives { .. })
        ));
    }

    #[test]
    fn duplicate_os_arch_is_invalid() {
        let v = version(
            "1.0.0",
            vec![archive("linux", "x86_64"), archive("linux", "x86_64")],
        );
        assert!(matches!(
            v.validate(),
            Err(ManifestError::DuplicateArchive { .. })
        ));
    }

    #[test]
    fn missing_ext_without_url_is_invalid() {
        let mut a = archive("linux", "x86_64");
        a.ext = None;
        let v = version("1.0.0", vec![a]);
        assert!(matches!(v.validate(), Err(ManifestError::MissingExt { .. })));
    }

    #[test]
    fn missing_ext_is_fine_when_version_has_url() {
        let mut a = archive("linux", "x86_64");
        a.ext = None;
        let mut v = version("1.0.0", vec![a]);
        v.url = Some("https://example.com/${os}-${arch}.bin".into());
        assert!(v.validate().is_ok());
    }

    #[test]
    fn manifest_round_trips() {
        let manifest = Manifest {
            description: "a tool".into(),
            versions: vec![version("1.0.0", vec![archive("linux", "x86_64")])],
            schema_version: "1.0.0".into(),
            license: None,
            homepage: None,
            extra: Map::new(),
        };
        let text = serde_json::to_string(&manifest).unwrap();
        let parsed = Manifest::parse(&text).unwrap();
        assert_eq!(parsed.description, manifest.description);
        assert_eq!(parsed.versions.len(), 1);
        assert_eq!(parsed.versions[0].version, "1.0.0");
    }

    #[test]
    fn schema_version_defaults_when_absent() {
        let text = r#"{"description":"x","versions":[]}"#;
        let parsed = Manifest::parse(text).unwrap();
        assert_eq!(parsed.schema_version, "1.0.0");
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let text = r#"{"description":"x","versions":[],"future_field":"kept"}"#;
        let parsed = Manifest::parse(text).unwrap();
        assert_eq!(
            parsed.extra.get("future_field").and_then(Value::as_str),
            Some("kept")
        );
    }
}
