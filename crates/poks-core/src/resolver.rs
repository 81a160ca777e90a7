use std::collections::BTreeMap;

use poks_schema::{Archive, AppVersion};

use crate::error::PoksError;

/// Extensions recognized by the Extractor, used both for `${ext}`
/// auto-detection (longest match wins) and for format dispatch.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".tar.gz", ".tar.xz", ".tar.bz2", ".tgz", ".txz", ".tbz2", ".conda", ".zip", ".7z",
];

/// Expand `${name}` placeholders in `template` using `vars`, in a
/// single left-to-right pass. No recursive expansion: a substituted
/// value never has its own placeholders expanded.
///
/// # Errors
///
/// Returns [`PoksError::VariableUnresolved`] on the first `${name}`
/// whose name isn't in `vars`.
pub fn expand_vars(template: &str, vars: &BTreeMap<&str, &str>) -> Result<String, PoksError> {
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        let rest = &template[i..];
        if let Some(after_dollar) = rest.strip_prefix("${") {
            if let Some(end) = after_dollar.find('}') {
                let name = &after_dollar[..end];
                let Some(value) = vars.get(name) else {
                    return Err(PoksError::VariableUnresolved {
                        name: name.to_string(),
                        template: template.to_string(),
                    });
                };
                out.push_str(value);
                i += 2 + end + 1;
                continue;
            }
        }
        let ch = rest.chars().next().expect("i is within bounds");
        out.push(ch);
        i += ch.len_utf8();
    }
    Ok(out)
}

/// Select the archive matching the host platform: the first
/// [`Archive`] in declaration order whose `(os, arch)` equals
/// `(host_os, host_arch)` (§4.2: "deterministic on insertion order").
///
/// # Errors
///
/// Returns [`PoksError::UnsupportedPlatform`] when no archive matches.
pub fn select_archive<'a>(
    app: &str,
    version: &'a AppVersion,
    host_os: &str,
    host_arch: &str,
) -> Result<&'a Archive, PoksError> {
    version
        .archive_for(host_os, host_arch)
        .ok_or_else(|| PoksError::UnsupportedPlatform {
            app: app.to_string(),
            version: version.version.clone(),
            os: host_os.to_string(),
            arch: host_arch.to_string(),
        })
}

/// Auto-detect the extension by longest matching suffix against
/// [`SUPPORTED_EXTENSIONS`].
pub fn detect_ext(url: &str) -> Option<&'static str> {
    let path = url.split('?').next().unwrap_or(url).to_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .filter(|ext| path.ends_with(*ext))
        .max_by_key(|ext| ext.len())
        .copied()
}

/// Compute the download URL for the selected archive: the archive's
/// own `url` overrides the version-level template; either way the
/// template is expanded with `{version, os, arch, ext}`. If `ext` is
/// absent on the archive, auto-detect it by longest matching suffix
/// against the template itself before expansion.
///
/// # Errors
///
/// Returns [`PoksError::VariableUnresolved`] if the template
/// references `${ext}` (or any other name) and no value could be
/// determined for it, or if neither archive nor version carries a URL
/// template at all.
pub fn compute_url(version: &AppVersion, archive: &Archive) -> Result<String, PoksError> {
    let template = archive.url.as_deref().or(version.url.as_deref()).ok_or(
        PoksError::VariableUnresolved {
            name: "url".to_string(),
            template: format!("<no url template for version {}>", version.version),
        },
    )?;

    let ext = archive
        .ext
        .clone()
        .or_else(|| detect_ext(template).map(str::to_string));

    let mut vars = BTreeMap::new();
    vars.insert("version", version.version.as_str());
    vars.insert("os", archive.os.as_str());
    vars.insert("arch", archive.arch.as_str());
    if let Some(ext) = ext.as_deref() {
        vars.insert("ext", ext);
    }

    expand_vars(template, &vars)
}
