//! End-to-end install scenarios driving a real [`Engine`] against a
//! `tempfile::tempdir()` root, a hand-populated bucket directory (no
//! `git` subprocess involved — bucket resolution by bare name reuses
//! whatever is already on disk under `buckets/<name>/`), and archives
//! served either by a local `mockito` HTTP server or read straight off
//! disk.

use std::io::Write;

use sha2::Digest;

use poks_core::{Engine, PoksError};
use poks_schema::{Archive, AppSelector, AppVersion, Config, InstallStatus, Manifest, Sha256};

fn gz_tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let buf = Vec::new();
    let encoder = flate2::write::GzEncoder::new(buf, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn single_version(version: &str, archives: Vec<Archive>) -> AppVersion {
    AppVersion {
        version: version.to_string(),
        archives,
        extract_dir: None,
        bin: Some(vec!["bin".to_string()]),
        env: None,
        license: None,
        yanked: None,
        url: None,
        extra: serde_json::Map::new(),
    }
}

fn manifest(description: &str, versions: Vec<AppVersion>) -> Manifest {
    Manifest {
        description: description.to_string(),
        versions,
        schema_version: "1.0.0".to_string(),
        license: None,
        homepage: None,
        extra: serde_json::Map::new(),
    }
}

fn write_manifest(bucket_dir: &std::path::Path, app: &str, manifest: &Manifest) {
    std::fs::create_dir_all(bucket_dir).unwrap();
    std::fs::write(
        bucket_dir.join(format!("{app}.json")),
        serde_json::to_string(manifest).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn happy_path_tar_gz_installs_and_persists_manifest() {
    let mut server = mockito::Server::new_async().await;
    let body = gz_tarball(&[("bin/hello", b"#!/bin/sh\necho hi\n")]);
    let sha256 = sha256_hex(&body);
    let _m = server
        .mock("GET", "/hello-1.0.0.tar.gz")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let url = format!("{}/hello-1.0.0.tar.gz", server.url());

    let (host_os, host_arch) = poks_core::platform::detect();
    let root = tempfile::tempdir().unwrap();
    write_manifest(
        &root.path().join("buckets/main"),
        "hello",
        &manifest(
            "hello world",
            vec![single_version(
                "1.0.0",
                vec![Archive {
                    os: host_os.as_str().to_string(),
                    arch: host_arch.as_str().to_string(),
                    sha256: Sha256::new(sha256).unwrap(),
                    ext: Some(".tar.gz".to_string()),
                    url: Some(url),
                }],
            )],
        ),
    );

    let engine = Engine::new(root.path());
    let report = engine
        .install_app("hello", Some("1.0.0"), Some("main"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, InstallStatus::Installed);
    let install_dir = &report.results[0].install_dir;
    assert!(install_dir.join("bin/hello").is_file());
    assert!(install_dir.join(".manifest.json").is_file());
}

#[tokio::test]
async fn checksum_mismatch_fails_the_install() {
    let mut server = mockito::Server::new_async().await;
    let body = gz_tarball(&[("bin/hello", b"payload")]);
    let _m = server
        .mock("GET", "/hello-1.0.0.tar.gz")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let url = format!("{}/hello-1.0.0.tar.gz", server.url());

    let (host_os, host_arch) = poks_core::platform::detect();
    let root = tempfile::tempdir().unwrap();
    write_manifest(
        &root.path().join("buckets/main"),
        "hello",
        &manifest(
            "hello world",
            vec![single_version(
                "1.0.0",
                vec![Archive {
                    os: host_os.as_str().to_string(),
                    arch: host_arch.as_str().to_string(),
                    sha256: Sha256::new("a".repeat(64)).unwrap(),
                    ext: Some(".tar.gz".to_string()),
                    url: Some(url),
                }],
            )],
        ),
    );

    let engine = Engine::new(root.path());
    let report = engine
        .install_app("hello", Some("1.0.0"), Some("main"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, InstallStatus::Failed);
    assert!(report.results[0].error.as_deref().unwrap().contains("checksum mismatch"));
}

#[tokio::test]
async fn two_apps_sharing_a_cache_key_extract_to_distinct_install_dirs() {
    let mut server = mockito::Server::new_async().await;
    let body = gz_tarball(&[("bin/tool", b"shared payload")]);
    let sha256 = sha256_hex(&body);
    let _m = server
        .mock("GET", "/shared.tar.gz")
        .with_status(200)
        .with_body(&body)
        .create_async()
        .await;
    let url = format!("{}/shared.tar.gz", server.url());

    let (host_os, host_arch) = poks_core::platform::detect();
    let archive = Archive {
        os: host_os.as_str().to_string(),
        arch: host_arch.as_str().to_string(),
        sha256: Sha256::new(sha256).unwrap(),
        ext: Some(".tar.gz".to_string()),
        url: Some(url),
    };

    let root = tempfile::tempdir().unwrap();
    let bucket_dir = root.path().join("buckets/main");
    write_manifest(&bucket_dir, "appa", &manifest("a", vec![single_version("1.0.0", vec![archive.clone()])]));
    write_manifest(&bucket_dir, "appb", &manifest("b", vec![single_version("1.0.0", vec![archive])]));

    let engine = Engine::new(root.path());
    let a = engine.install_app("appa", Some("1.0.0"), Some("main")).await.unwrap();
    let b = engine.install_app("appb", Some("1.0.0"), Some("main")).await.unwrap();

    assert_eq!(a.results[0].status, InstallStatus::Installed);
    assert_eq!(b.results[0].status, InstallStatus::Installed);
    assert_ne!(a.results[0].install_dir, b.results[0].install_dir);
    assert!(a.results[0].install_dir.join("bin/tool").is_file());
    assert!(b.results[0].install_dir.join("bin/tool").is_file());

    let cache_entries: Vec<_> = std::fs::read_dir(root.path().join("cache"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(cache_entries.len(), 1, "both apps should share the one cached archive");
}

#[tokio::test]
async fn yanked_version_is_rejected_before_any_download() {
    let mut version = single_version(
        "1.0.0",
        vec![Archive {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            sha256: Sha256::new("a".repeat(64)).unwrap(),
            ext: Some(".tar.gz".to_string()),
            url: Some("https://example.invalid/never-fetched.tar.gz".to_string()),
        }],
    );
    version.yanked = Some("CVE-2025-XXXX".to_string());

    let root = tempfile::tempdir().unwrap();
    write_manifest(
        &root.path().join("buckets/main"),
        "hello",
        &manifest("hello world", vec![version]),
    );

    let engine = Engine::new(root.path());
    let err = engine
        .install_app("hello", Some("1.0.0"), Some("main"))
        .await
        .unwrap_err();
    assert!(matches!(err, PoksError::YankedVersion { .. }));
}

#[tokio::test]
async fn platform_filtered_selector_is_skipped_without_touching_buckets() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(root.path());

    let config = Config {
        buckets: vec![],
        apps: vec![AppSelector {
            name: poks_schema::AppName::new("windows-only"),
            version: "1.0.0".to_string(),
            bucket: None,
            os: Some(vec!["windows".to_string()]),
            arch: None,
        }],
    };

    let report = engine.install(&config).await.unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, InstallStatus::SkippedPlatform);
}

fn build_inner_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
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

fn build_conda_bytes(info_entries: &[(&str, &[u8])], pkg_entries: &[(&str, &[u8])]) -> Vec<u8> {
    let info_zst = zstd::encode_all(&build_inner_tar(info_entries)[..], 0).unwrap();
    let pkg_zst = zstd::encode_all(&build_inner_tar(pkg_entries)[..], 0).unwrap();

    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("info-abc.tar.zst", opts).unwrap();
        writer.write_all(&info_zst).unwrap();
        writer.start_file("pkg-abc.tar.zst", opts).unwrap();
        writer.write_all(&pkg_zst).unwrap();
        writer.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn conda_archive_extracts_and_pokes_runtime_prefix() {
    let paths_json = br#"{"paths":[{"_path":"lib/tool.sh","prefix_placeholder":"/opt/placeholder","file_mode":"text"}]}"#;
    let conda_bytes = build_conda_bytes(
        &[("info/paths.json", paths_json)],
        &[("lib/tool.sh", b"#!/bin/sh\ncd /opt/placeholder\n")],
    );
    let sha256 = sha256_hex(&conda_bytes);

    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/pkg-1.0.0.conda")
        .with_status(200)
        .with_body(&conda_bytes)
        .create_async()
        .await;
    let url = format!("{}/pkg-1.0.0.conda", server.url());

    let (host_os, host_arch) = poks_core::platform::detect();
    let root = tempfile::tempdir().unwrap();
    write_manifest(
        &root.path().join("buckets/main"),
        "condapkg",
        &manifest(
            "conda-style package",
            vec![single_version(
                "1.0.0",
                vec![Archive {
                    os: host_os.as_str().to_string(),
                    arch: host_arch.as_str().to_string(),
                    sha256: Sha256::new(sha256).unwrap(),
                    ext: Some(".conda".to_string()),
                    url: Some(url),
                }],
            )],
        ),
    );

    let engine = Engine::new(root.path());
    let report = engine
        .install_app("condapkg", Some("1.0.0"), Some("main"))
        .await
        .unwrap();

    assert_eq!(report.results[0].status, InstallStatus::Installed);
    let install_dir = &report.results[0].install_dir;
    let patched = std::fs::read_to_string(install_dir.join("lib/tool.sh")).unwrap();
    assert!(patched.contains(&install_dir.display().to_string()));
    assert!(!patched.contains("/opt/placeholder"));
}
