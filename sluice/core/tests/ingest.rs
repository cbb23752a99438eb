//! Integration tests for the ingest stage.

mod common;

use common::*;
use sluice_core::ingest::{run_ingest, IngestError};
use sluice_storage::{Bucket, BucketStatus};

#[tokio::test]
async fn test_uploads_every_csv_file() {
    let source = SourceDir::olist();
    source.write("README.md", "not a csv");
    source.write("sellers.CSV", "seller_id\ns1\n");

    let bucket = Bucket::in_memory("raw-csv");
    let report = run_ingest(&source.ingest_config(), &bucket, &runner())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        report.outcomes.keys().cloned().collect::<Vec<_>>(),
        vec!["raw/customers.csv", "raw/orders.csv", "raw/sellers.CSV"]
    );

    let keys = bucket.list_prefix("raw/").await.unwrap();
    assert_eq!(
        keys,
        vec!["raw/customers.csv", "raw/orders.csv", "raw/sellers.CSV"]
    );

    let content = bucket.get("raw/orders.csv").await.unwrap();
    assert_eq!(content.as_ref(), orders_csv(2).as_bytes());
    assert_eq!(
        report.outcomes["raw/orders.csv"].as_ref().unwrap().bytes,
        orders_csv(2).len()
    );
}

#[tokio::test]
async fn test_rerun_overwrites_same_keys() {
    let source = SourceDir::olist();
    let bucket = Bucket::in_memory("raw-csv");
    let config = source.ingest_config();

    run_ingest(&config, &bucket, &runner()).await.unwrap();
    let first = bucket.list_prefix("raw/").await.unwrap();

    source.write("orders.csv", &orders_csv(4));
    let report = run_ingest(&config, &bucket, &runner()).await.unwrap();
    let second = bucket.list_prefix("raw/").await.unwrap();

    assert!(report.is_success());
    assert_eq!(first, second);
    assert_eq!(bucket.ensure_exists().await.unwrap(), BucketStatus::AlreadyExists);

    let content = bucket.get("raw/orders.csv").await.unwrap();
    assert_eq!(content.as_ref(), orders_csv(4).as_bytes());
}

#[tokio::test]
async fn test_prefix_is_concatenated_verbatim() {
    let source = SourceDir::olist();
    let bucket = Bucket::in_memory("raw-csv");
    let mut config = source.ingest_config();
    config.prefix = "olist_".to_string();

    let report = run_ingest(&config, &bucket, &runner()).await.unwrap();

    assert!(report.outcomes.contains_key("olist_orders.csv"));
    assert_eq!(
        bucket.list_prefix("olist_").await.unwrap(),
        vec!["olist_customers.csv", "olist_orders.csv"]
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_empty_directory_is_not_an_error() {
    let source = SourceDir::new();
    let bucket = Bucket::in_memory("raw-csv");

    let report = run_ingest(&source.ingest_config(), &bucket, &runner())
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(report.outcomes.is_empty());
    assert!(logs_contain("No CSV files found under"));
    assert!(bucket.list_prefix("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_source_directory_fails() {
    let source = SourceDir::new();
    let mut config = source.ingest_config();
    config.source_dir = source.path().join("does-not-exist");

    let err = run_ingest(&config, &Bucket::in_memory("raw-csv"), &runner())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::SourceDir { .. }));
}

#[tokio::test]
async fn test_source_must_be_a_directory() {
    let source = SourceDir::olist();
    let mut config = source.ingest_config();
    config.source_dir = source.path().join("orders.csv");

    let err = run_ingest(&config, &Bucket::in_memory("raw-csv"), &runner())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::NotADirectory(_)));
}

#[tokio::test]
async fn test_local_bucket_is_created() {
    let source = SourceDir::olist();
    let root = tempfile::tempdir().unwrap();
    let bucket = Bucket::with_provider(
        "raw-csv",
        std::sync::Arc::new(sluice_storage::LocalFileProvider::new(root.path())),
    )
    .unwrap();

    let report = run_ingest(&source.ingest_config(), &bucket, &runner())
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(root.path().join("raw-csv/raw/orders.csv").is_file());
    assert!(root.path().join("raw-csv/raw/customers.csv").is_file());
}

#[tokio::test]
async fn test_failed_upload_does_not_stop_other_files() {
    let source = SourceDir::olist();
    // control characters cannot be part of an object key
    source.write("bad\u{1}.csv", "id\n1\n");

    let bucket = Bucket::in_memory("raw-csv");
    let report = run_ingest(&source.ingest_config(), &bucket, &runner())
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcomes["raw/bad\u{1}.csv"],
        Err(IngestError::Upload { .. })
    ));
    assert_eq!(
        bucket.list_prefix("raw/").await.unwrap(),
        vec!["raw/customers.csv", "raw/orders.csv"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_utf8_file_name_is_a_file_error() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let source = SourceDir::olist();
    let path = source.path().join(OsStr::from_bytes(b"orders\xff.csv"));
    std::fs::write(&path, orders_csv(1)).unwrap();

    let bucket = Bucket::in_memory("raw-csv");
    let report = run_ingest(&source.ingest_config(), &bucket, &runner())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    let failed = &report.outcomes[&path.display().to_string()];
    assert!(matches!(failed, Err(IngestError::FileName(_))));
    assert_eq!(
        bucket.list_prefix("raw/").await.unwrap(),
        vec!["raw/customers.csv", "raw/orders.csv"]
    );
}
