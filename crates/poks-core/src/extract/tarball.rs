use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tar::Archive;

use crate::error::PoksError;

use super::safe_join;

/// Extract a gzip-compressed tarball (`.tar.gz`/`.tgz`).
pub fn extract_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), PoksError> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(file);
    extract_tar(decoder, dest_dir)
}

/// Extract an xz-compressed tarball (`.tar.xz`/`.txz`).
pub fn extract_xz(archive_path: &Path, dest_dir: &Path) -> Result<(), PoksError> {
    let file = File::open(archive_path)?;
    let decoder = xz2::read::XzDecoder::new(file);
    extract_tar(decoder, dest_dir)
}

/// Extract a bzip2-compressed tarball (`.tar.bz2`/`.tbz2`).
pub fn extract_bz2(archive_path: &Path, dest_dir: &Path) -> Result<(), PoksError> {
    let file = File::open(archive_path)?;
    let decoder = bzip2::read::BzDecoder::new(file);
    extract_tar(decoder, dest_dir)
}

/// Entry-by-entry extraction shared by every tar-based format:
/// validates each member path, extracts symlinks only when their
/// target resolves under `dest_dir`, and preserves POSIX mode bits.
pub(super) fn extract_tar(reader: impl Read, dest_dir: &Path) -> Result<(), PoksError> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let member_path = entry.path()?.into_owned();
        let target = safe_join(dest_dir, &member_path)?;

        let header = entry.header().clone();
        match header.entry_type() {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&target)?;
            }
            tar::EntryType::Symlink => {
                extract_symlink(&entry, dest_dir, &target)?;
            }
            _ => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut entry, &mut out)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let mode = header.mode().unwrap_or(0o644);
                    std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn extract_symlink<R: Read>(
    entry: &tar::Entry<'_, R>,
    dest_dir: &Path,
    target: &Path,
) -> Result<(), PoksError> {
    let Some(link_name) = entry.link_name()? else {
        return Ok(());
    };
    if safe_join(dest_dir, &link_name).is_err() {
        tracing::warn!(target = %link_name.display(), "skipping symlink with target outside dest_dir");
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(target);
    std::os::unix::fs::symlink(link_name, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn extract_symlink<R: Read>(
    entry: &tar::Entry<'_, R>,
    _dest_dir: &Path,
    _target: &Path,
) -> Result<(), PoksError> {
    let _ = entry;
    Ok(())
}
