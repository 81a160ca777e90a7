use std::path::Path;

use crate::error::PoksError;

use super::safe_join;

/// Extract a `.7z` archive into `dest_dir`.
///
/// `sevenz-rust2` only exposes one-shot extraction into a directory it
/// controls, with no per-entry hook to reject unsafe paths before
/// writing. We extract into a scratch directory first, then walk the
/// result and move each entry into `dest_dir` through [`safe_join`],
/// so the same path-safety invariant holds as for zip/tar.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<(), PoksError> {
    let scratch = tempfile::tempdir()?;
    sevenz_rust2::decompress_file(archive_path, scratch.path())
        .map_err(|e| PoksError::IoError(std::io::Error::other(e)))?;

    for entry in walkdir::WalkDir::new(scratch.path())
        .min_depth(1)
        .into_iter()
    {
        let entry = entry.map_err(|e| PoksError::IoError(std::io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(scratch.path())
            .expect("walkdir entries are under scratch root");
        let target = safe_join(dest_dir, relative)?;

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(entry.path(), &target)
                .or_else(|_| std::fs::copy(entry.path(), &target).map(|_| ()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_rejects_paths_outside_dest_dir() {
        // safe_join alone enforces the invariant this module depends on;
        // exercised directly since building a real .7z fixture here
        // would require the archive format itself, not this module.
        let dest = Path::new("/dest");
        let err = safe_join(dest, Path::new("../../etc/passwd")).unwrap_err();
        assert!(matches!(err, PoksError::UnsafeArchive(_)));
    }
}
