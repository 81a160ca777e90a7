//! `.conda` payload extraction (§4.6): zip container with two
//! zstd-compressed inner tarballs, `paths.json` metadata, and prefix
//! patching via the Poker.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::PoksError;
use crate::poker::{self, FileMode, PatchEntry};

use super::tarball::extract_tar;

#[derive(Debug, Deserialize)]
struct PathsJson {
    paths: Vec<PathsEntryJson>,
}

#[derive(Debug, Deserialize)]
struct PathsEntryJson {
    #[serde(rename = "_path")]
    path: String,
    prefix_placeholder: Option<String>,
    file_mode: Option<String>,
}

/// Extract a `.conda` archive: unpack the `pkg-*.tar.zst` payload into
/// `dest_dir` on disk, then read `paths.json` from the
/// `info-*.tar.zst` metadata member and apply prefix patches so that
/// patched files read as though they already live at
/// `runtime_prefix` — the app's final install directory, which may
/// differ from `dest_dir` when extraction writes to a staging
/// directory ahead of an atomic rename into place.
///
/// # Errors
///
/// Returns [`PoksError::ManifestInvalid`] if either inner member or
/// `paths.json` is missing or malformed, [`PoksError::UnsafeArchive`]
/// for unsafe payload paths, [`PoksError::PrefixTooLong`] if a
/// relocation doesn't fit, or [`PoksError::IoError`] on filesystem
/// failure.
pub fn extract(archive_path: &Path, dest_dir: &Path, runtime_prefix: &str) -> Result<(), PoksError> {
    let file = File::open(archive_path)?;
    let mut zip = zip::ZipArchive::new(file).map_err(to_io)?;

    let info_idx = find_member(&mut zip, "info-")?;
    let pkg_idx = find_member(&mut zip, "pkg-")?;

    let paths_json = read_paths_json(&mut zip, info_idx)?;

    {
        let entry = zip.by_index(pkg_idx).map_err(to_io)?;
        let decoder = zstd::stream::read::Decoder::new(entry)?;
        extract_tar(decoder, dest_dir)?;
    }

    let entries: Vec<PatchEntry> = paths_json
        .paths
        .into_iter()
        .filter_map(|p| {
            let placeholder = p.prefix_placeholder?;
            let mode = match p.file_mode.as_deref() {
                Some("binary") => FileMode::Binary,
                Some("text") => FileMode::Text,
                other => {
                    tracing::warn!(file_mode = ?other, path = %p.path, "unrecognized file_mode, defaulting to text");
                    FileMode::Text
                }
            };
            Some(PatchEntry {
                path: p.path,
                prefix_placeholder: placeholder,
                file_mode: mode,
            })
        })
        .collect();

    poker::apply_patches(dest_dir, runtime_prefix, &entries)
}

fn find_member(zip: &mut zip::ZipArchive<File>, prefix: &str) -> Result<usize, PoksError> {
    for i in 0..zip.len() {
        let name = zip.by_index(i).map_err(to_io)?.name().to_string();
        if name.starts_with(prefix) && name.ends_with(".tar.zst") {
            return Ok(i);
        }
    }
    Err(PoksError::ManifestInvalid {
        app: "conda".to_string(),
        reason: format!("no {prefix}*.tar.zst member found"),
    })
}

fn read_paths_json(zip: &mut zip::ZipArchive<File>, info_idx: usize) -> Result<PathsJson, PoksError> {
    let entry = zip.by_index(info_idx).map_err(to_io)?;
    let decoder = zstd::stream::read::Decoder::new(entry)?;
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()? == Path::new("info/paths.json") {
            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            return serde_json::from_str(&contents).map_err(|err| PoksError::ManifestInvalid {
                app: "conda".to_string(),
                reason: format!("malformed paths.json: {err}"),
            });
        }
    }
    Err(PoksError::ManifestInvalid {
        app: "conda".to_string(),
        reason: "info/paths.json not found in info member".to_string(),
    })
}

fn to_io(err: zip::result::ZipError) -> PoksError {
    PoksError::IoError(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn find_member_rejects_archive_with_no_matching_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("empty.zip");
        let file = File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.finish().unwrap();

        let file = File::open(&archive_path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let err = find_member(&mut zip, "info-").unwrap_err();
        assert!(matches!(err, PoksError::ManifestInvalid { .. }));
    }

    fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *contents).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn build_conda(info_entries: &[(&str, &[u8])], pkg_entries: &[(&str, &[u8])]) -> Vec<u8> {
        let info_zst = zstd::encode_all(&build_tar(info_entries)[..], 0).unwrap();
        let pkg_zst = zstd::encode_all(&build_tar(pkg_entries)[..], 0).unwrap();

        let mut buf = Vec::new();
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("info-abc.tar.zst", opts).unwrap();
        writer.write_all(&info_zst).unwrap();
        writer.start_file("pkg-abc.tar.zst", opts).unwrap();
        writer.write_all(&pkg_zst).unwrap();
        writer.finish().unwrap();
        drop(writer);
        buf
    }

    #[test]
    fn extract_unpacks_payload_and_pokes_prefix() {
        let paths_json = br#"{"paths":[{"_path":"lib/tool.sh","prefix_placeholder":"/opt/placeholder","file_mode":"text"}]}"#;
        let conda_bytes = build_conda(
            &[("info/paths.json", paths_json)],
            &[("lib/tool.sh", b"#!/bin/sh\ncd /opt/placeholder\n")],
        );

        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("pkg.conda");
        std::fs::write(&archive_path, &conda_bytes).unwrap();

        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        extract(&archive_path, &dest, "/final/install/dir").unwrap();

        let patched = std::fs::read_to_string(dest.join("lib/tool.sh")).unwrap();
        assert!(patched.contains("/final/install/dir"));
        assert!(!patched.contains("/opt/placeholder"));
    }
}
