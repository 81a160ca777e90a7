use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::PoksError;

use super::safe_join;

/// Extract a `.zip` archive into `dest_dir`, validating every member
/// path and preserving POSIX executable bits.
pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<(), PoksError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(to_io)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(to_io)?;
        let Some(enclosed) = entry.enclosed_name() else {
            return Err(PoksError::UnsafeArchive(
                entry.mangled_name(),
            ));
        };
        let target = safe_join(dest_dir, &enclosed)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if entry.is_symlink() {
            extract_symlink(&mut entry, dest_dir, &target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn extract_symlink(
    entry: &mut zip::read::ZipFile<'_>,
    dest_dir: &Path,
    target: &Path,
) -> Result<(), PoksError> {
    let mut link_target = String::new();
    io::Read::read_to_string(entry, &mut link_target)?;
    if safe_join(dest_dir, Path::new(&link_target)).is_err() {
        // Target escapes dest_dir: skip with a warning rather than fail.
        tracing::warn!(target = %link_target, "skipping symlink with target outside dest_dir");
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(target);
    std::os::unix::fs::symlink(&link_target, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn extract_symlink(
    entry: &mut zip::read::ZipFile<'_>,
    _dest_dir: &Path,
    target: &Path,
) -> Result<(), PoksError> {
    // Windows: write the link target text as a regular file rather
    // than require elevated privileges for symlink creation.
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    io::copy(entry, &mut out)?;
    Ok(())
}

fn to_io(err: zip::result::ZipError) -> PoksError {
    PoksError::IoError(std::io::Error::other(err))
}
