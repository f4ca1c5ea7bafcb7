//! S3 store integration tests
//!
//! **Requirements**:
//! - MinIO or S3 must be running and accessible
//! - `CRAWLER_TEST_S3_ENDPOINT` must be set (e.g. "http://localhost:9000")
//! - The bucket named by `CRAWLER_TEST_S3_BUCKET` (default "crawler-test")
//!   must exist
//! - Tests are skipped if `CRAWLER_TEST_S3_ENDPOINT` is not configured
//!
//! Credentials default to MinIO's `minioadmin`; override them with
//! `CRAWLER_TEST_S3_ACCESS_KEY` and `CRAWLER_TEST_S3_SECRET_KEY`.

use chrono::Utc;
use crawler::store::{ObjectStore, S3Store, StoreConfig};

async fn setup_store() -> Option<S3Store> {
    let endpoint = std::env::var("CRAWLER_TEST_S3_ENDPOINT").ok()?;
    let bucket =
        std::env::var("CRAWLER_TEST_S3_BUCKET").unwrap_or_else(|_| "crawler-test".to_string());

    let mut config = StoreConfig::for_minio(endpoint, bucket);
    if let (Ok(ak), Ok(sk)) = (
        std::env::var("CRAWLER_TEST_S3_ACCESS_KEY"),
        std::env::var("CRAWLER_TEST_S3_SECRET_KEY"),
    ) {
        config = config.with_credentials(ak, sk);
    }

    match S3Store::new(config).await {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("Failed to create S3 store: {}", e);
            None
        }
    }
}

/// Prefix unique to one test run
fn test_prefix(test_name: &str) -> String {
    format!(
        "crawler-tests/{}/{}/",
        test_name,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[tokio::test]
async fn test_put_list_get_delete() {
    let Some(store) = setup_store().await else {
        println!("Skipping test: CRAWLER_TEST_S3_ENDPOINT not configured");
        return;
    };

    let prefix = test_prefix("roundtrip");
    let key = format!("{}2024-01-01/x.csv", prefix);
    let content = b"timestamp,value\n2024-01-01T00:00:00.000Z,1\n".to_vec();

    store.put(&key, content.clone()).await.unwrap();

    let listed = store.list(&prefix).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, key);
    assert_eq!(listed[0].size, content.len() as u64);

    assert_eq!(store.get(&key).await.unwrap(), content);

    store.delete(&key).await.unwrap();
    assert!(store.list(&prefix).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_follows_pagination() {
    let Some(store) = setup_store().await else {
        println!("Skipping test: CRAWLER_TEST_S3_ENDPOINT not configured");
        return;
    };

    // ListObjectsV2 returns at most 1000 keys per page
    let prefix = test_prefix("pagination");
    let keys: Vec<String> = (0..1005).map(|i| format!("{}{:05}.csv", prefix, i)).collect();
    for key in &keys {
        store.put(key, vec![0]).await.unwrap();
    }

    let listed = store.list(&prefix).await.unwrap();
    assert_eq!(listed.len(), keys.len());

    for key in &keys {
        store.delete(key).await.unwrap();
    }
}

#[tokio::test]
async fn test_missing_object() {
    let Some(store) = setup_store().await else {
        println!("Skipping test: CRAWLER_TEST_S3_ENDPOINT not configured");
        return;
    };

    let prefix = test_prefix("missing");
    assert!(store.get(&format!("{}nope.csv", prefix)).await.is_err());
    // Deleting a missing key succeeds on S3
    store.delete(&format!("{}nope.csv", prefix)).await.unwrap();
}
