//! Integration tests for the load stage.

mod common;

use bytes::Bytes;
use common::*;
use sluice_core::{
    load::{run_load, LoadError},
    warehouse::MemoryWarehouse,
};
use sluice_schemas::{LoadConfig, WriteMode};
use sluice_storage::Bucket;

async fn bucket_with(objects: &[(&str, String)]) -> Bucket {
    let bucket = Bucket::in_memory("raw-csv");
    for (key, content) in objects {
        bucket
            .put(key, Bytes::from(content.clone()))
            .await
            .unwrap();
    }
    bucket
}

#[tokio::test]
async fn test_one_table_per_csv_object() {
    let bucket = bucket_with(&[
        ("raw/orders.csv", orders_csv(2)),
        ("raw/customers.csv", customers_csv()),
        ("raw/notes.txt", "ignored".to_string()),
        ("other/sellers.csv", "seller_id\ns1\n".to_string()),
    ])
    .await;
    let warehouse = MemoryWarehouse::new();

    let report = run_load(&load_config(), &bucket, &warehouse, &runner())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.succeeded(), 2);

    let orders = report.outcomes["raw/orders.csv"].as_ref().unwrap();
    assert_eq!(orders.table, "orders");
    assert_eq!(orders.rows, 2);
    assert_eq!(orders.columns, 3);

    assert_eq!(warehouse.row_count("orders").await.unwrap(), 2);
    assert_eq!(warehouse.row_count("customers").await.unwrap(), 5);
    assert_eq!(
        warehouse.column_names("orders").await.unwrap(),
        vec!["order_id", "customer_id", "total"]
    );
    assert!(!warehouse.table_exists("notes").unwrap());
    assert!(!warehouse.table_exists("sellers").unwrap());
}

#[tokio::test]
async fn test_rerun_replaces_table_contents() {
    let bucket = bucket_with(&[
        ("raw/orders.csv", orders_csv(2)),
        ("raw/customers.csv", customers_csv()),
    ])
    .await;
    let warehouse = MemoryWarehouse::new();
    let config = load_config();

    run_load(&config, &bucket, &warehouse, &runner()).await.unwrap();
    run_load(&config, &bucket, &warehouse, &runner()).await.unwrap();
    assert_eq!(warehouse.row_count("orders").await.unwrap(), 2);
    assert_eq!(warehouse.row_count("customers").await.unwrap(), 5);

    bucket
        .put("raw/orders.csv", Bytes::from(orders_csv(4)))
        .await
        .unwrap();
    run_load(&config, &bucket, &warehouse, &runner()).await.unwrap();

    assert_eq!(warehouse.row_count("orders").await.unwrap(), 4);
    assert_eq!(warehouse.row_count("customers").await.unwrap(), 5);
}

#[tokio::test]
async fn test_append_mode_keeps_existing_rows() {
    let bucket = bucket_with(&[("raw/orders.csv", orders_csv(2))]).await;
    let warehouse = MemoryWarehouse::new();
    let config = LoadConfig::builder().write_mode(WriteMode::Append).build();

    run_load(&config, &bucket, &warehouse, &runner()).await.unwrap();
    run_load(&config, &bucket, &warehouse, &runner()).await.unwrap();

    assert_eq!(warehouse.row_count("orders").await.unwrap(), 4);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_bad_object_does_not_stop_others() {
    let bucket = bucket_with(&[
        ("raw/orders.csv", orders_csv(2)),
        ("raw/broken.csv", "a,b\n1,2\n3,4,5\n".to_string()),
        ("raw/empty.csv", String::new()),
    ])
    .await;
    let warehouse = MemoryWarehouse::new();

    let report = run_load(&load_config(), &bucket, &warehouse, &runner())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 2);
    assert!(matches!(
        report.outcomes["raw/broken.csv"],
        Err(LoadError::Parse { ref key, .. }) if key == "raw/broken.csv"
    ));
    assert!(matches!(
        report.outcomes["raw/empty.csv"],
        Err(LoadError::Parse { .. })
    ));

    assert_eq!(warehouse.row_count("orders").await.unwrap(), 2);
    assert!(!warehouse.table_exists("broken").unwrap());
    assert!(!warehouse.table_exists("empty").unwrap());
    assert!(logs_contain("Finished loading table 'orders'"));
}

#[tokio::test]
async fn test_keys_sharing_a_table_name_conflict() {
    let bucket = bucket_with(&[
        ("raw/2023/orders.csv", orders_csv(2)),
        ("raw/2024/orders.csv", orders_csv(3)),
        ("raw/customers.csv", customers_csv()),
    ])
    .await;
    let warehouse = MemoryWarehouse::new();

    let report = run_load(&load_config(), &bucket, &warehouse, &runner())
        .await
        .unwrap();

    assert_eq!(report.failed(), 2);
    for key in ["raw/2023/orders.csv", "raw/2024/orders.csv"] {
        assert!(matches!(
            report.outcomes[key],
            Err(LoadError::TableConflict { ref table, .. }) if table == "orders"
        ));
    }
    assert!(!warehouse.table_exists("orders").unwrap());
    assert_eq!(warehouse.row_count("customers").await.unwrap(), 5);
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_empty_listing_creates_no_table() {
    let bucket = Bucket::in_memory("raw-csv");
    let warehouse = MemoryWarehouse::new();

    let report = run_load(&load_config(), &bucket, &warehouse, &runner())
        .await
        .unwrap();

    assert!(report.is_success());
    assert!(report.outcomes.is_empty());
    assert!(!warehouse.table_exists("orders").unwrap());
    assert!(logs_contain("No CSV objects found"));
}

#[tokio::test]
async fn test_raw_string_prefix() {
    let bucket = bucket_with(&[
        ("raw/olist_orders.csv", orders_csv(2)),
        ("raw/olist_customers.csv", customers_csv()),
        ("raw/sellers.csv", "seller_id\ns1\n".to_string()),
    ])
    .await;
    let warehouse = MemoryWarehouse::new();
    let config = LoadConfig::builder().prefix("raw/olist_".to_string()).build();

    let report = run_load(&config, &bucket, &warehouse, &runner())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert!(warehouse.table_exists("olist_orders").unwrap());
    assert!(!warehouse.table_exists("sellers").unwrap());
}
