//! Integration tests against MinIO via testcontainers
//!
//! These tests require Docker and spin up a MinIO instance for realistic
//! S3 behavior (pagination, error codes, nested keys, marker objects).
//!
//! Run with: cargo test --test s3_integration
//!
//! Tests are conditionally skipped if Docker is not available.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;

use s3_transfer::s3::{ListError, S3Client, S3ClientConfig};
use s3_transfer::transfer::{
    BatchStatus, CancelFlag, NoopReporter, TransferEngine, TransferRequest, UploadItem,
};

const MINIO_ACCESS_KEY: &str = "minioadmin";
const MINIO_SECRET_KEY: &str = "minioadmin";

fn docker_available() -> bool {
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

async fn start_minio() -> (ContainerAsync<MinIO>, String) {
    let container = MinIO::default()
        .with_env_var("MINIO_ROOT_USER", MINIO_ACCESS_KEY)
        .with_env_var("MINIO_ROOT_PASSWORD", MINIO_SECRET_KEY)
        .start()
        .await
        .expect("Failed to start MinIO container");

    let host = container.get_host().await.expect("Failed to get container host");
    let port = container
        .get_host_port_ipv4(9000)
        .await
        .expect("Failed to get MinIO port");
    let endpoint = format!("http://{}:{}", host, port);

    // Give MinIO a moment to come up.
    tokio::time::sleep(Duration::from_secs(2)).await;

    (container, endpoint)
}

fn transfer_client(endpoint: &str) -> S3Client {
    S3Client::with_config(S3ClientConfig {
        endpoint_url: Some(endpoint.to_string()),
        force_path_style: true,
        region: Some("us-east-1".to_string()),
        access_key_id: Some(MINIO_ACCESS_KEY.to_string()),
        secret_access_key: Some(MINIO_SECRET_KEY.to_string()),
    })
}

/// Raw SDK client for test fixtures (bucket creation, seeding, verification).
fn raw_client(endpoint: &str) -> aws_sdk_s3::Client {
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            MINIO_ACCESS_KEY,
            MINIO_SECRET_KEY,
            None,
            None,
            "test-fixture",
        ))
        .endpoint_url(endpoint)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(config)
}

async fn seed_object(client: &aws_sdk_s3::Client, bucket: &str, key: &str, data: &[u8]) {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(data.to_vec().into())
        .send()
        .await
        .unwrap_or_else(|e| panic!("Failed to seed object '{key}': {e}"));
}

async fn create_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .unwrap_or_else(|e| panic!("Failed to create bucket '{bucket}': {e}"));
}

#[tokio::test]
async fn test_list_keys_filters_markers_and_follows_pagination() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let raw = raw_client(&endpoint);
    create_bucket(&raw, "listing").await;

    for i in 0..25 {
        seed_object(&raw, "listing", &format!("data/file-{i:04}.txt"), b"x").await;
    }
    // Pseudo-directory marker and a key outside the prefix.
    seed_object(&raw, "listing", "data/empty-folder/", b"").await;
    seed_object(&raw, "listing", "other/file.txt", b"x").await;

    let client = transfer_client(&endpoint);

    // Small pages force the scan through several continuation tokens.
    let first_page = client
        .list_page("listing", "data/", None, 10)
        .await
        .expect("Failed to list first page");
    assert_eq!(first_page.keys.len(), 10);
    assert!(first_page.is_truncated);
    assert!(first_page.next_token.is_some());

    let keys = client
        .list_keys("listing", "data/")
        .await
        .expect("Failed to list keys");

    assert_eq!(keys.len(), 25);
    assert!(keys.iter().all(|k| !k.as_str().ends_with('/')));
    assert!(keys.iter().all(|k| k.as_str().starts_with("data/")));

    // Store's native lexicographic ordering is preserved.
    let raw_keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    let mut sorted = raw_keys.clone();
    sorted.sort();
    assert_eq!(raw_keys, sorted);
}

#[tokio::test]
async fn test_missing_bucket_maps_to_bucket_not_found() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let client = transfer_client(&endpoint);

    let result = client.list_keys("does-not-exist", "").await;
    assert!(matches!(
        result,
        Err(ListError::BucketNotFound { ref bucket }) if bucket == "does-not-exist"
    ));
}

#[tokio::test]
async fn test_download_batch_preserving_subpaths() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let raw = raw_client(&endpoint);
    create_bucket(&raw, "downloads").await;

    seed_object(&raw, "downloads", "egress/a.txt", b"alpha").await;
    seed_object(&raw, "downloads", "egress/nested/b.txt", b"beta").await;
    seed_object(&raw, "downloads", "egress/nested/deep/c.txt", b"gamma").await;
    seed_object(&raw, "downloads", "egress/placeholder/", b"").await;

    let root = tempfile::TempDir::new().unwrap();
    let engine = TransferEngine::new(transfer_client(&endpoint));
    let request = TransferRequest::download(
        "downloads",
        "egress/",
        Some(root.path().to_path_buf()),
        true,
    );

    let outcome = engine
        .run(request.clone(), Arc::new(NoopReporter), &CancelFlag::new())
        .await
        .expect("Download batch failed");

    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(outcome.status(), BatchStatus::AllSucceeded);

    assert_eq!(std::fs::read(root.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(
        std::fs::read(root.path().join("nested/b.txt")).unwrap(),
        b"beta"
    );
    assert_eq!(
        std::fs::read(root.path().join("nested/deep/c.txt")).unwrap(),
        b"gamma"
    );

    // Re-running into the same root overwrites identically.
    let second = engine
        .run(request, Arc::new(NoopReporter), &CancelFlag::new())
        .await
        .expect("Second download batch failed");
    assert_eq!(second.succeeded, 3);
    assert_eq!(std::fs::read(root.path().join("a.txt")).unwrap(), b"alpha");
}

#[tokio::test]
async fn test_download_batch_flattened() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let raw = raw_client(&endpoint);
    create_bucket(&raw, "flat").await;

    seed_object(&raw, "flat", "in/sub/one.txt", b"1").await;
    seed_object(&raw, "flat", "in/two.txt", b"2").await;

    let root = tempfile::TempDir::new().unwrap();
    let engine = TransferEngine::new(transfer_client(&endpoint));
    let request =
        TransferRequest::download("flat", "in/", Some(root.path().to_path_buf()), false);

    let outcome = engine
        .run(request, Arc::new(NoopReporter), &CancelFlag::new())
        .await
        .expect("Download batch failed");

    assert_eq!(outcome.succeeded, 2);
    assert!(root.path().join("one.txt").exists());
    assert!(root.path().join("two.txt").exists());
    assert!(!root.path().join("sub").exists());
}

#[tokio::test]
async fn test_empty_prefix_yields_no_items_not_error() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let raw = raw_client(&endpoint);
    create_bucket(&raw, "empty").await;

    let root = tempfile::TempDir::new().unwrap();
    let engine = TransferEngine::new(transfer_client(&endpoint));
    let request =
        TransferRequest::download("empty", "nothing/", Some(root.path().to_path_buf()), true);

    let outcome = engine
        .run(request, Arc::new(NoopReporter), &CancelFlag::new())
        .await
        .expect("Empty listing must not be an error");

    assert!(outcome.is_empty());
    assert_eq!(outcome.status(), BatchStatus::NoItems);
}

#[tokio::test]
async fn test_upload_batch_round_trip() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    let (_container, endpoint) = start_minio().await;
    let raw = raw_client(&endpoint);
    create_bucket(&raw, "uploads").await;

    let dir = tempfile::TempDir::new().unwrap();
    let report = dir.path().join("report.csv");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&report, "id,value\n1,2\n").unwrap();
    std::fs::write(&notes, "some notes").unwrap();

    let engine = TransferEngine::new(transfer_client(&endpoint));
    let uploads = vec![
        UploadItem {
            local_source: report,
            remote_name: "report.csv".to_string(),
        },
        UploadItem {
            local_source: notes,
            remote_name: "notes.txt".to_string(),
        },
        UploadItem {
            local_source: PathBuf::from(dir.path().join("missing.txt")),
            remote_name: "missing.txt".to_string(),
        },
    ];
    let request = TransferRequest::upload("uploads", "incoming", uploads);

    let outcome = engine
        .run(request, Arc::new(NoopReporter), &CancelFlag::new())
        .await
        .expect("Upload batch failed");

    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed(), 1);
    assert!(outcome.failures[0].item.ends_with("missing.txt"));

    let body = raw
        .get_object()
        .bucket("uploads")
        .key("incoming/report.csv")
        .send()
        .await
        .expect("Uploaded object missing")
        .body
        .collect()
        .await
        .unwrap();
    assert_eq!(body.into_bytes().as_ref(), b"id,value\n1,2\n");
}
