//! Legacy Ingestion Integration Tests
//!
//! Migration must never overwrite, and must give every dangling encoded file
//! its own placeholder original.

mod common;

use std::path::{Path, PathBuf};

use clipvault::domain::CopyOutcome;
use clipvault::store::digest_file;
use clipvault::{ingest, ArtifactKind, ContentDigest, StoreError};
use common::{content_root, write_file};
use tempfile::TempDir;

fn legacy_dir(temp: &TempDir) -> PathBuf {
    let legacy = temp.path().join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    legacy
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_originals_are_copied() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    write_file(&legacy, "original/city/city1.mp4", b"city1");
    write_file(&legacy, "original/beach.mp4", b"beach");

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert_eq!(report.originals.len(), 2);
    assert!(report
        .originals
        .iter()
        .all(|entry| entry.outcome == CopyOutcome::Copied));
    assert_eq!(read(&root.originals_dir().join("city/city1.mp4")), b"city1");
    assert_eq!(read(&root.originals_dir().join("beach.mp4")), b"beach");
}

#[tokio::test]
async fn test_conflicting_original_is_left_untouched() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    let existing = write_file(&root.originals_dir(), "a.mp4", b"D1 content");
    write_file(&legacy, "original/a.mp4", b"D2 content");

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert_eq!(read(&existing), b"D1 content");
    let conflicts: Vec<_> = report.conflicts().collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(
        conflicts[0].outcome,
        CopyOutcome::Conflict {
            existing: ContentDigest::of_bytes(b"D1 content"),
            incoming: ContentDigest::of_bytes(b"D2 content"),
        }
    );
}

#[tokio::test]
async fn test_identical_original_is_not_copied_again() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    let existing = write_file(&root.originals_dir(), "a.mp4", b"same");
    let before = std::fs::metadata(&existing).unwrap().modified().unwrap();
    write_file(&legacy, "original/a.mp4", b"same");

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert_eq!(report.originals[0].outcome, CopyOutcome::Identical);
    assert_eq!(report.conflicts().count(), 0);
    assert_eq!(std::fs::metadata(&existing).unwrap().modified().unwrap(), before);
}

#[tokio::test]
async fn test_encoded_is_keyed_by_matching_original() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    // Legacy originals carry arbitrary extensions
    write_file(&legacy, "original/city/city1.MOV", b"original bytes");
    write_file(&legacy, "encoded/city/city1.h264", b"legacy stream");
    write_file(&legacy, "thumbnails/city/city1.png", b"legacy thumb");

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert!(report.dummies.is_empty());
    let key = ContentDigest::of_bytes(b"original bytes");
    let target = root.artifact_path(&key, ArtifactKind::Encoded);
    assert_eq!(report.encoded[0].target, target);
    assert_eq!(report.encoded[0].outcome, CopyOutcome::Copied);
    assert_eq!(read(&target), b"legacy stream");

    // Thumbnails are regenerated later, never migrated
    assert!(!root.has_artifact(&key, ArtifactKind::Thumbnail));
}

#[tokio::test]
async fn test_dangling_encoded_gets_dummy_original() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    write_file(&legacy, "encoded/lost/clip.h264", b"orphan stream");

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert_eq!(report.dummies.len(), 1);
    let dummy = &report.dummies[0];
    assert_eq!(dummy.path, root.originals_dir().join("lost/clip.dummy"));
    // Content is a UUID string
    let token = std::fs::read_to_string(&dummy.path).unwrap();
    assert!(uuid::Uuid::parse_str(&token).is_ok());
    assert_eq!(dummy.digest, digest_file(&dummy.path).await.unwrap());

    let target = root.artifact_path(&dummy.digest, ArtifactKind::Encoded);
    assert_eq!(read(&target), b"orphan stream");
}

#[tokio::test]
async fn test_dummies_from_separate_runs_do_not_collide() {
    let (root, temp) = content_root().await;
    let first_legacy = temp.path().join("first");
    let second_legacy = temp.path().join("second");
    write_file(&first_legacy, "encoded/one.h264", b"stream one");
    write_file(&second_legacy, "encoded/two.h264", b"stream two");

    let first = ingest(root.path(), &first_legacy).await.unwrap();
    let second = ingest(root.path(), &second_legacy).await.unwrap();

    assert_eq!(first.dummies.len(), 1);
    assert_eq!(second.dummies.len(), 1);
    assert_ne!(first.dummies[0].path, second.dummies[0].path);
    assert_ne!(first.dummies[0].digest, second.dummies[0].digest);
    assert!(root.has_artifact(&first.dummies[0].digest, ArtifactKind::Encoded));
    assert!(root.has_artifact(&second.dummies[0].digest, ArtifactKind::Encoded));
}

#[tokio::test]
async fn test_rerun_reuses_existing_dummy() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    write_file(&legacy, "encoded/clip.h264", b"orphan stream");

    let first = ingest(root.path(), &legacy).await.unwrap();
    let second = ingest(root.path(), &legacy).await.unwrap();

    assert_eq!(first.dummies.len(), 1);
    assert!(second.dummies.is_empty());
    assert_eq!(second.encoded[0].outcome, CopyOutcome::Identical);
    assert_eq!(
        second.encoded[0].target,
        root.artifact_path(&first.dummies[0].digest, ArtifactKind::Encoded)
    );
}

#[tokio::test]
async fn test_conflicting_encoded_is_left_untouched() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);
    write_file(&legacy, "original/a.mp4", b"original");
    write_file(&legacy, "encoded/a.h264", b"legacy stream");
    let key = ContentDigest::of_bytes(b"original");
    let target = root.artifact_path(&key, ArtifactKind::Encoded);
    std::fs::create_dir_all(root.store_dir()).unwrap();
    std::fs::write(&target, b"freshly encoded stream").unwrap();

    let report = ingest(root.path(), &legacy).await.unwrap();

    assert!(matches!(
        report.encoded[0].outcome,
        CopyOutcome::Conflict { .. }
    ));
    assert_eq!(read(&target), b"freshly encoded stream");
}

#[tokio::test]
async fn test_rejects_root_without_marker() {
    let temp = TempDir::new().unwrap();
    let legacy = legacy_dir(&temp);

    let result = ingest(temp.path(), &legacy).await;
    assert!(matches!(result, Err(StoreError::NotAContentRoot { .. })));
}

#[tokio::test]
async fn test_missing_legacy_subtrees_are_empty() {
    let (root, temp) = content_root().await;
    let legacy = legacy_dir(&temp);

    let report = ingest(root.path(), &legacy).await.unwrap();
    assert!(report.originals.is_empty());
    assert!(report.encoded.is_empty());
    assert!(report.failures.is_empty());
}
