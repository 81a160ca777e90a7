use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bucket::{AppSelector, Bucket};
use crate::error::ManifestError;

/// The `poks.json` config file: the buckets to sync and the apps to
/// install. Unknown fields are rejected (unlike the manifest format,
/// which is forward-compatible).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Buckets to sync before resolving any app.
    pub buckets: Vec<Bucket>,
    /// Apps to install.
    pub apps: Vec<AppSelector>,
}

impl Config {
    /// Parse a config from JSON text without validating invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError::Json`] on malformed or unrecognized
    /// JSON.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate this config's invariants: bucket names unique, and
    /// every selector's `bucket` (when set) resolves to a declared
    /// bucket.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] describing the first violated
    /// invariant.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut names = HashSet::new();
        for bucket in &self.buckets {
            if !names.insert(bucket.name.as_str()) {
                return Err(ManifestError::DuplicateBucket {
                    name: bucket.name.clone(),
                });
            }
        }
        for app in &self.apps {
            if let Some(bucket) = &app.bucket {
                if !names.contains(bucket.as_str()) {
                    return Err(ManifestError::UndeclaredBucket {
                        app: app.name.to_string(),
                        bucket: bucket.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::AppName;

    fn bucket(name: &str) -> Bucket {
        Bucket {
            name: name.into(),
            url: format!("https://example.com/{name}.git"),
        }
    }

    fn selector(name: &str, bucket: Option<&str>) -> AppSelector {
        AppSelector {
            name: AppName::new(name),
            version: "1.0.0".into(),
            bucket: bucket.map(str::to_string),
            os: None,
            arch: None,
        }
    }

    #[test]
    fn duplicate_bucket_name_is_invalid() {
        let cfg = Config {
            buckets: vec![bucket("main"), bucket("main")],
            apps: vec![],
        };
        assert!(matches!(
            cfg.validate(),
            Err(ManifestError::DuplicateBucket { .. })
        ));
    }

    #[test]
    fn undeclared_bucket_reference_is_invalid() {
        let cfg = Config {
            buckets: vec![bucket("main")],
            apps: vec![selector("foo", Some("extras"))],
        };
        assert!(matches!(
            cfg.validate(),
            Err(ManifestError::UndeclaredBucket { .. })
        ));
    }

    #[test]
    fn valid_config_passes() {
        let cfg = Config {
            buckets: vec![bucket("main")],
            apps: vec![selector("foo", Some("main")), selector("bar", None)],
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let text = r#"{"buckets":[],"apps":[],"surprise":true}"#;
        assert!(Config::parse(text).is_err());
    }
}
