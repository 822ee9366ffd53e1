mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use envault_core::RemoteFile;
use envault_sync::{sync_secure_files, NoProgress, SyncOptions};

use common::{remote_file, MemorySource, RecordingProgress, Served};

fn leftover_tmp_files(dir: &std::path::Path) -> Vec<String> {
    walk(dir)
        .into_iter()
        .filter(|name| name.ends_with(".envault.tmp"))
        .collect()
}

fn walk(dir: &std::path::Path) -> Vec<String> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            names.extend(walk(&path));
        } else {
            names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        }
    }
    names
}

#[tokio::test]
async fn orphan_deleted_and_missing_file_downloaded() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("old.pem"), "stale").unwrap();

    let cert = b"-----BEGIN CERTIFICATE-----\n".to_vec();
    let manifest = vec![remote_file("cert.pem", &cert)];
    let source = Arc::new(MemorySource::new().with("uuid-cert.pem", Served::Bytes(cert.clone())));

    let report = sync_secure_files(
        &dir,
        &manifest,
        source,
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert!(!dir.join("old.pem").exists());
    assert_eq!(fs::read(dir.join("cert.pem")).unwrap(), cert);
    assert_eq!(report.deleted, vec![dir.join("old.pem")]);
    assert_eq!(report.downloaded, vec!["cert.pem".to_string()]);
    assert!(report.is_clean());
    assert_eq!(walk(&dir), vec!["cert.pem".to_string()]);
}

#[tokio::test]
async fn matching_hash_transfers_nothing() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("app.key"), b"same bytes").unwrap();
    let before = fs::metadata(dir.join("app.key")).unwrap().modified().unwrap();

    let manifest = vec![remote_file("app.key", b"same bytes")];
    let source = Arc::new(MemorySource::new().with("uuid-app.key", Served::Bytes(b"same bytes".to_vec())));

    let report = sync_secure_files(
        &dir,
        &manifest,
        source.clone(),
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert_eq!(report.skipped, vec!["app.key".to_string()]);
    assert!(source.opened().is_empty());
    assert_eq!(source.bytes_served(), 0);
    assert_eq!(fs::metadata(dir.join("app.key")).unwrap().modified().unwrap(), before);
}

#[tokio::test]
async fn hash_mismatch_redownloads_and_overwrites() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("app.key"), b"old local bytes").unwrap();

    let fresh = b"fresh server bytes".to_vec();
    let manifest = vec![remote_file("app.key", &fresh)];
    let source = Arc::new(MemorySource::new().with("uuid-app.key", Served::Bytes(fresh.clone())));

    let report = sync_secure_files(
        &dir,
        &manifest,
        source.clone(),
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert_eq!(report.downloaded, vec!["app.key".to_string()]);
    assert_eq!(fs::read(dir.join("app.key")).unwrap(), fresh);
    assert_eq!(source.bytes_served(), fresh.len() as u64);
}

#[tokio::test]
async fn force_download_ignores_matching_hash() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("app.key"), b"bytes").unwrap();

    let manifest = vec![remote_file("app.key", b"bytes")];
    let source = Arc::new(MemorySource::new().with("uuid-app.key", Served::Bytes(b"bytes".to_vec())));
    let options = SyncOptions {
        force_download: true,
        ..SyncOptions::default()
    };

    let report = sync_secure_files(&dir, &manifest, source.clone(), Arc::new(NoProgress), &options)
        .await
        .expect("sync");

    assert_eq!(report.downloaded, vec!["app.key".to_string()]);
    assert_eq!(source.opened(), vec!["app.key".to_string()]);
}

#[tokio::test]
async fn one_failure_does_not_stop_siblings() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");

    let good = b"good content".to_vec();
    let manifest = vec![
        remote_file("refused.pem", b"x"),
        remote_file("broken.pem", b"whatever"),
        remote_file("good.pem", &good),
    ];
    let source = Arc::new(
        MemorySource::new()
            .with("uuid-refused.pem", Served::Refused("connection refused".into()))
            .with("uuid-broken.pem", Served::BrokenAfter(b"partial!".to_vec()))
            .with("uuid-good.pem", Served::Bytes(good.clone())),
    );

    let report = sync_secure_files(
        &dir,
        &manifest,
        source,
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync returns a report even when files fail");

    assert_eq!(report.downloaded, vec!["good.pem".to_string()]);
    let failed: Vec<_> = report.failed.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["refused.pem", "broken.pem"]);
    assert!(report.failed[0].message.contains("connection refused"));
    assert!(report.failed[1].message.contains("connection reset"));

    assert_eq!(fs::read(dir.join("good.pem")).unwrap(), good);
    assert!(!dir.join("broken.pem").exists(), "partial download must not be finalized");
    assert!(leftover_tmp_files(&dir).is_empty());
}

#[tokio::test]
async fn stalled_stream_fails_after_timeout() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");

    let manifest = vec![
        remote_file("slow.bin", b"never completes"),
        remote_file("fast.bin", b"fast"),
    ];
    let source = Arc::new(
        MemorySource::new()
            .with("uuid-slow.bin", Served::StallAfter(b"never".to_vec()))
            .with("uuid-fast.bin", Served::Bytes(b"fast".to_vec())),
    );
    let options = SyncOptions {
        force_download: false,
        stall_timeout: Duration::from_millis(100),
    };

    let report = sync_secure_files(&dir, &manifest, source, Arc::new(NoProgress), &options)
        .await
        .expect("sync");

    assert_eq!(report.downloaded, vec!["fast.bin".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "slow.bin");
    assert!(report.failed[0].message.contains("no data received"));
    assert!(!dir.join("slow.bin").exists());
    assert!(leftover_tmp_files(&dir).is_empty());
}

#[tokio::test]
async fn escaping_names_are_rejected_per_file() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    let manifest = vec![RemoteFile {
        name: "../escape.pem".to_string(),
        uuid: "uuid-escape".to_string(),
        content_hash: String::new(),
    }];
    let source = Arc::new(MemorySource::new().with("uuid-escape", Served::Bytes(b"x".to_vec())));

    let report = sync_secure_files(
        &dir,
        &manifest,
        source.clone(),
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].message.contains("invalid file name"));
    assert!(source.opened().is_empty());
    assert!(!root.path().join("escape.pem").exists());
}

#[tokio::test]
async fn nested_names_create_subdirectories() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    let manifest = vec![remote_file("ios/dist.p12", b"p12")];
    let source = Arc::new(MemorySource::new().with("uuid-ios/dist.p12", Served::Bytes(b"p12".to_vec())));

    let report = sync_secure_files(
        &dir,
        &manifest,
        source,
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert!(report.is_clean());
    assert_eq!(fs::read(dir.join("ios").join("dist.p12")).unwrap(), b"p12");
}

#[tokio::test]
async fn progress_reports_bytes_against_declared_total() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");
    let content = b"0123456789".to_vec();
    let manifest = vec![remote_file("data.bin", &content)];
    let source = Arc::new(MemorySource::new().with("uuid-data.bin", Served::Bytes(content)));
    let progress = Arc::new(RecordingProgress::default());

    sync_secure_files(&dir, &manifest, source, progress.clone(), &SyncOptions::default())
        .await
        .expect("sync");

    assert_eq!(
        progress.events(),
        vec![
            "stage Reconciling".to_string(),
            "stage Downloading".to_string(),
            "started data.bin Some(10)".to_string(),
            "advanced data.bin 4".to_string(),
            "advanced data.bin 8".to_string(),
            "advanced data.bin 10".to_string(),
            "finished data.bin 10".to_string(),
        ]
    );
}

#[tokio::test]
async fn repeated_name_downloads_once_and_reports_the_repeat() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join(".secure_files");

    let first = RemoteFile {
        name: "cert.pem".into(),
        uuid: "uuid-a".into(),
        content_hash: envault_sync::hash::md5_bytes(b"first"),
    };
    let second = RemoteFile {
        uuid: "uuid-b".into(),
        content_hash: envault_sync::hash::md5_bytes(b"second"),
        ..first.clone()
    };
    let source = Arc::new(
        MemorySource::new()
            .with("uuid-a", Served::Bytes(b"first".to_vec()))
            .with("uuid-b", Served::Bytes(b"second".to_vec())),
    );

    let report = sync_secure_files(
        &dir,
        &[first, second],
        source.clone(),
        Arc::new(NoProgress),
        &SyncOptions::default(),
    )
    .await
    .expect("sync");

    assert_eq!(report.downloaded, vec!["cert.pem".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "cert.pem");
    assert!(report.failed[0].message.contains("more than once"), "{}", report.failed[0]);
    assert_eq!(source.opened(), vec!["cert.pem".to_string()]);
    assert_eq!(fs::read(dir.join("cert.pem")).unwrap(), b"first");
    assert!(leftover_tmp_files(&dir).is_empty());
}
