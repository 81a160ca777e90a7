//! The Extractor (§4.5): format detection, path-safety-checked
//! unpacking, and `extract_dir` flattening.

mod sevenz;
mod tarball;
mod zipfmt;

pub mod conda;

use std::path::{Component, Path, PathBuf};

use crate::error::PoksError;
use crate::resolver::SUPPORTED_EXTENSIONS;

/// A recognized archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz` / `.txz`
    TarXz,
    /// `.tar.bz2` / `.tbz2`
    TarBz2,
    /// `.7z`
    SevenZ,
    /// `.conda`
    Conda,
}

/// Detect the archive format by longest matching extension suffix.
///
/// # Errors
///
/// Returns [`PoksError::UnsupportedArchive`] for unrecognized
/// extensions.
pub fn detect_format(path: &Path) -> Result<Format, PoksError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let ext = SUPPORTED_EXTENSIONS
        .iter()
        .filter(|ext| name.ends_with(*ext))
        .max_by_key(|ext| ext.len())
        .ok_or_else(|| PoksError::UnsupportedArchive(name.clone()))?;

    Ok(match *ext {
        ".zip" => Format::Zip,
        ".tar.gz" | ".tgz" => Format::TarGz,
        ".tar.xz" | ".txz" => Format::TarXz,
        ".tar.bz2" | ".tbz2" => Format::TarBz2,
        ".7z" => Format::SevenZ,
        ".conda" => Format::Conda,
        other => return Err(PoksError::UnsupportedArchive(other.to_string())),
    })
}

/// Validate that a member's relative path is safe to extract under
/// `dest_dir`: relative, no `..` segments, resolves under `dest_dir`
/// after normalization. Returns the joined absolute path.
///
/// # Errors
///
/// Returns [`PoksError::UnsafeArchive`] for absolute paths, traversal,
/// or any path that would resolve outside `dest_dir`.
pub fn safe_join(dest_dir: &Path, member: &Path) -> Result<PathBuf, PoksError> {
    if member.is_absolute() {
        return Err(PoksError::UnsafeArchive(member.to_path_buf()));
    }
    let mut normalized = PathBuf::new();
    for component in member.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PoksError::UnsafeArchive(member.to_path_buf()));
            }
        }
    }
    Ok(dest_dir.join(normalized))
}

/// Extract `archive_path` into a fresh `dest_dir`, applying
/// `extract_dir` flattening if set, and return the final directory
/// (`dest_dir` itself, unless flattening changes what's considered
/// the "root" — the contents still land under `dest_dir` either way,
/// matching §4.5's "returns the final directory").
///
/// `runtime_prefix` is the app's final install directory as an
/// absolute path string. For every format but `.conda` it's unused;
/// for `.conda` it's the value baked into prefix-patched files,
/// which may differ from `dest_dir` when the caller extracts into a
/// staging directory ahead of an atomic rename into place.
///
/// # Errors
///
/// Propagates [`PoksError::UnsupportedArchive`],
/// [`PoksError::UnsafeArchive`], [`PoksError::ExtractDirNotFound`],
/// [`PoksError::PrefixTooLong`], or [`PoksError::IoError`].
pub async fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    extract_dir: Option<&str>,
    runtime_prefix: &str,
) -> Result<PathBuf, PoksError> {
    let format = detect_format(archive_path)?;
    tokio::fs::create_dir_all(dest_dir).await?;

    let archive_path = archive_path.to_path_buf();
    let dest = dest_dir.to_path_buf();
    let runtime_prefix = runtime_prefix.to_string();
    tokio::task::spawn_blocking(move || match format {
        Format::Zip => zipfmt::extract(&archive_path, &dest),
        Format::TarGz => tarball::extract_gz(&archive_path, &dest),
        Format::TarXz => tarball::extract_xz(&archive_path, &dest),
        Format::TarBz2 => tarball::extract_bz2(&archive_path, &dest),
        Format::SevenZ => sevenz::extract(&archive_path, &dest),
        Format::Conda => conda::extract(&archive_path, &dest, &runtime_prefix),
    })
    .await
    .map_err(|e| PoksError::IoError(std::io::Error::other(e)))??;

    if let Some(name) = extract_dir {
        flatten_extract_dir(dest_dir, name).await?;
    }

    Ok(dest_dir.to_path_buf())
}

/// When `extract_dir` names a top-level directory, relocate its
/// children directly under `dest_dir` and remove the now-empty
/// wrapper. Siblings of the named directory are left in place.
///
/// # Errors
///
/// Returns [`PoksError::ExtractDirNotFound`] if the named directory
/// doesn't exist after extraction.
async fn flatten_extract_dir(dest_dir: &Path, name: &str) -> Result<(), PoksError> {
    let wrapper = dest_dir.join(name);
    if !wrapper.is_dir() {
        return Err(PoksError::ExtractDirNotFound(name.to_string()));
    }

    let mut entries = tokio::fs::read_dir(&wrapper).await?;
    while let Some(entry) = entries.next_entry().await? {
        let target = dest_dir.join(entry.file_name());
        tokio::fs::rename(entry.path(), target).await?;
    }
    tokio::fs::remove_dir(&wrapper).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format_prefers_longest_suffix() {
        assert_eq!(
            detect_format(Path::new("foo.tar.gz")).unwrap(),
            Format::TarGz
        );
        assert_eq!(detect_format(Path::new("foo.tgz")).unwrap(), Format::TarGz);
        assert_eq!(
            detect_format(Path::new("foo.conda")).unwrap(),
            Format::Conda
        );
    }

    #[test]
    fn detect_format_rejects_unknown_extension() {
        assert!(matches!(
            detect_format(Path::new("foo.exe")),
            Err(PoksError::UnsupportedArchive(_))
        ));
    }

    #[test]
    fn safe_join_rejects_absolute_member() {
        let dest = Path::new("/dest");
        let err = safe_join(dest, Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, PoksError::UnsafeArchive(_)));
    }

    #[test]
    fn safe_join_rejects_parent_traversal() {
        let dest = Path::new("/dest");
        let err = safe_join(dest, Path::new("../escape")).unwrap_err();
        assert!(matches!(err, PoksError::UnsafeArchive(_)));
    }

    #[test]
    fn safe_join_accepts_nested_relative_path() {
        let dest = Path::new("/dest");
        let joined = safe_join(dest, Path::new("bin/tool")).unwrap();
        assert_eq!(joined, Path::new("/dest/bin/tool"));
    }

    #[tokio::test]
    async fn flatten_extract_dir_fails_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = flatten_extract_dir(dir.path(), "missing").await.unwrap_err();
        assert!(matches!(err, PoksError::ExtractDirNotFound(_)));
    }

    #[tokio::test]
    async fn flatten_extract_dir_relocates_children_and_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("wrap/bin")).await.unwrap();
        tokio::fs::write(dir.path().join("wrap/bin/tool"), b"x").await.unwrap();
        tokio::fs::create_dir_all(dir.path().join("sibling")).await.unwrap();

        flatten_extract_dir(dir.path(), "wrap").await.unwrap();

        assert!(dir.path().join("bin/tool").is_file());
        assert!(!dir.path().join("wrap").exists());
        assert!(dir.path().join("sibling").is_dir());
    }
}
