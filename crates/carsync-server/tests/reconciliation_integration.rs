//! End-to-end reconciliation tests against a live PostgreSQL database.
//!
//! Ignored by default: they need `DATABASE_URL` pointing at a disposable
//! database. Run them serially, since they share tables:
//!
//! ```text
//! cargo test -p carsync-server -- --ignored --test-threads=1
//! ```

use carsync_server::sync::{resolver, CatalogClient, Reconciler, SourceConfig, SyncConfig};
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::watch;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_pool() -> PgPool {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = PgPool::connect(&url).await.expect("failed to connect");
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("migrations failed");
    sqlx::query("TRUNCATE vehicles, car_models, makes, sync_runs RESTART IDENTITY CASCADE")
        .execute(&pool)
        .await
        .expect("failed to reset tables");
    pool
}

fn reconciler_for(pool: PgPool, source_uri: String) -> Reconciler {
    let config = SyncConfig {
        source: SourceConfig {
            base_url: source_uri,
            app_id: "test-app".to_string(),
            master_key: "test-key".to_string(),
            timeout_secs: 5,
            fetch_limit: 10_000,
        },
        ..Default::default()
    };
    let client = CatalogClient::new(config.source.clone()).expect("client");
    Reconciler::new(pool, client, &config)
}

async fn mount_snapshot(server: &MockServer, results: serde_json::Value) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .mount(server)
        .await;
}

fn snapshot() -> serde_json::Value {
    json!([
        {
            "objectId": "car-1",
            "Make": "Toyota",
            "Model": "Corolla",
            "Year": 2015,
            "Category": "Sedan",
            "createdAt": "2020-01-06T12:25:35.741Z",
            "updatedAt": "2020-01-06T12:25:35.741Z"
        },
        {
            "objectId": "car-2",
            "Make": "Toyota",
            "Model": "RAV4",
            "Year": 2018,
            "Category": "SUV"
        },
        {
            "objectId": "car-3",
            "Make": "Honda",
            "Model": "Civic",
            "Year": 2016,
            "Category": "Sedan"
        }
    ])
}

#[tokio::test]
#[ignore] // requires a database
async fn concurrent_make_resolution_creates_single_row() {
    let pool = test_pool().await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let mut tx = pool.begin().await.expect("begin");
            let id = resolver::resolve_make(&mut tx, "Toyota").await.expect("resolve");
            tx.commit().await.expect("commit");
            id
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.expect("join"));
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "all racers must resolve to the same make row");

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM makes WHERE LOWER(name) = 'toyota'")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // requires a database
async fn reconciliation_cycle_is_idempotent() {
    let pool = test_pool().await;
    let server = MockServer::start().await;
    mount_snapshot(&server, snapshot()).await;

    let reconciler = reconciler_for(pool.clone(), server.uri());
    let (_tx, shutdown) = watch::channel(false);

    let first = reconciler.run_cycle(&shutdown).await.expect("first cycle");
    assert_eq!(first.inserted, 3);
    assert_eq!(first.failed_batches, 0);

    let second = reconciler.run_cycle(&shutdown).await.expect("second cycle");
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 3);

    let vehicles = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(vehicles, 3);
}

#[tokio::test]
#[ignore] // requires a database
async fn resync_updates_changed_category_without_duplicating() {
    let pool = test_pool().await;
    let server = MockServer::start().await;
    mount_snapshot(&server, snapshot()).await;

    let reconciler = reconciler_for(pool.clone(), server.uri());
    let (_tx, shutdown) = watch::channel(false);
    reconciler.run_cycle(&shutdown).await.expect("first cycle");

    let before: chrono::DateTime<chrono::Utc> = sqlx::query_scalar(
        "SELECT updated_at FROM vehicles WHERE external_id = 'car-1'",
    )
    .fetch_one(&pool)
    .await
    .expect("updated_at");

    // same external id, different category
    server.reset().await;
    let mut changed = snapshot();
    changed[0]["Category"] = json!("Hatchback");
    mount_snapshot(&server, changed).await;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let summary = reconciler.run_cycle(&shutdown).await.expect("second cycle");
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 2);

    let (category, after): (String, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        "SELECT category, updated_at FROM vehicles WHERE external_id = 'car-1'",
    )
    .fetch_one(&pool)
    .await
    .expect("row");
    assert_eq!(category, "Hatchback");
    assert!(after > before, "updated_at must advance on change");

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 3, "re-syncing must never duplicate rows");
}

#[tokio::test]
#[ignore] // requires a database
async fn out_of_range_years_are_never_stored() {
    let pool = test_pool().await;
    let server = MockServer::start().await;
    mount_snapshot(
        &server,
        json!([
            { "objectId": "old-1", "Make": "Ford", "Model": "Focus", "Year": 2005, "Category": "Sedan" },
            { "objectId": "new-1", "Make": "Ford", "Model": "Focus", "Year": 2015, "Category": "Sedan" }
        ]),
    )
    .await;

    let reconciler = reconciler_for(pool.clone(), server.uri());
    let (_tx, shutdown) = watch::channel(false);
    let summary = reconciler.run_cycle(&shutdown).await.expect("cycle");

    assert_eq!(summary.inserted, 1);

    let stored = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles WHERE year = 2005")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(stored, 0);
}

#[tokio::test]
#[ignore] // requires a database
async fn failed_batch_does_not_block_other_batches() {
    let pool = test_pool().await;
    let server = MockServer::start().await;

    // batch_size 1 turns each record into its own batch; the middle record's
    // category overflows VARCHAR(100), so its batch fails every attempt
    let oversized = "X".repeat(200);
    mount_snapshot(
        &server,
        json!([
            { "objectId": "ok-1", "Make": "Toyota", "Model": "Corolla", "Year": 2015, "Category": "Sedan" },
            { "objectId": "bad-1", "Make": "Toyota", "Model": "RAV4", "Year": 2018, "Category": oversized },
            { "objectId": "ok-2", "Make": "Honda", "Model": "Civic", "Year": 2016, "Category": "Sedan" }
        ]),
    )
    .await;

    let config = SyncConfig {
        batch_size: 1,
        retry_base_delay_ms: 10,
        source: SourceConfig {
            base_url: server.uri(),
            app_id: "test-app".to_string(),
            master_key: "test-key".to_string(),
            timeout_secs: 5,
            fetch_limit: 10_000,
        },
        ..Default::default()
    };
    let client = CatalogClient::new(config.source.clone()).expect("client");
    let reconciler = Reconciler::new(pool.clone(), client, &config);

    let (_tx, shutdown) = watch::channel(false);
    let summary = reconciler.run_cycle(&shutdown).await.expect("cycle");

    assert_eq!(summary.failed_batches, 1);
    assert_eq!(summary.inserted, 2);

    let stored: Vec<String> =
        sqlx::query_scalar("SELECT external_id FROM vehicles ORDER BY external_id")
            .fetch_all(&pool)
            .await
            .expect("rows");
    assert_eq!(stored, vec!["ok-1".to_string(), "ok-2".to_string()]);
}

#[tokio::test]
#[ignore] // requires a database
async fn shutdown_before_first_batch_cancels_run_without_writes() {
    let pool = test_pool().await;
    let server = MockServer::start().await;
    mount_snapshot(&server, snapshot()).await;

    let reconciler = reconciler_for(pool.clone(), server.uri());
    let (tx, shutdown) = watch::channel(false);
    tx.send(true).expect("signal shutdown");

    let summary = reconciler.run_cycle(&shutdown).await.expect("cycle");
    assert_eq!(summary.inserted, 0);

    let status: String =
        sqlx::query_scalar("SELECT status FROM sync_runs ORDER BY id DESC LIMIT 1")
            .fetch_one(&pool)
            .await
            .expect("status");
    assert_eq!(status, "cancelled");

    let vehicles = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(vehicles, 0);
}
