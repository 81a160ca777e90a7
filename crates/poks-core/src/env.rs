//! The Environment Collector (§4.7): derives `PATH` and templated
//! environment variable updates from an installed app.

use std::collections::BTreeMap;
use std::path::Path;

use poks_schema::AppVersion;

use crate::error::PoksError;
use crate::resolver::expand_vars;

/// Collect the environment updates an installed app contributes:
/// one deduplicated, order-preserving `PATH` entry for every `bin`
/// directory, plus the app's `env` templates expanded with
/// `${dir}` bound to `install_dir`.
///
/// # Errors
///
/// Returns [`PoksError::VariableUnresolved`] if an `env` template
/// references an unknown variable.
pub fn collect_env_updates(
    version: &AppVersion,
    install_dir: &Path,
) -> Result<BTreeMap<String, String>, PoksError> {
    let mut updates = BTreeMap::new();

    if let Some(bin) = &version.bin {
        let mut seen = std::collections::HashSet::new();
        let mut path_entries = Vec::new();
        for entry in bin {
            let resolved = install_dir.join(entry);
            let text = resolved.to_string_lossy().into_owned();
            if seen.insert(text.clone()) {
                path_entries.push(text);
            }
        }
        if !path_entries.is_empty() {
            updates.insert(
                "PATH".to_string(),
                path_entries.join(path_separator()),
            );
        }
    }

    if let Some(env) = &version.env {
        let dir = install_dir.to_string_lossy().into_owned();
        let vars: BTreeMap<&str, &str> = BTreeMap::from([("dir", dir.as_str())]);
        for (key, template) in env {
            updates.insert(key.clone(), expand_vars(template, &vars)?);
        }
    }

    Ok(updates)
}

/// Merge env updates from multiple apps in declaration order:
/// `PATH` values are concatenated (order preserved, deduplicated);
/// other keys are overwritten by later entries, with `on_conflict`
/// invoked for every non-`PATH` overwrite.
pub fn merge_env_updates(
    updates: &[BTreeMap<String, String>],
    mut on_conflict: impl FnMut(&str, &str, &str),
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    let mut path_entries: Vec<String> = Vec::new();
    let mut seen_path = std::collections::HashSet::new();

    for update in updates {
        for (key, value) in update {
            if key == "PATH" {
                for entry in value.split(path_separator()) {
                    if seen_path.insert(entry.to_string()) {
                        path_entries.push(entry.to_string());
                    }
                }
                continue;
            }
            if let Some(existing) = merged.get(key) {
                if existing != value {
                    on_conflict(key, existing, value);
                }
            }
            merged.insert(key.clone(), value.clone());
        }
    }

    if !path_entries.is_empty() {
        merged.insert("PATH".to_string(), path_entries.join(path_separator()));
    }
    merged
}

fn path_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}
