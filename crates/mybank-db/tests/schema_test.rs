//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let applied = mybank_db::run_migrations(&db).await.unwrap();
    assert_eq!(applied, 1);

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("user"), "missing user table");
    assert!(info_str.contains("session"), "missing session table");
    assert!(info_str.contains("account"), "missing account table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    assert_eq!(mybank_db::run_migrations(&db).await.unwrap(), 1);
    assert_eq!(mybank_db::run_migrations(&db).await.unwrap(), 0);

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unsupported_currency_is_rejected_by_schema() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mybank_db::run_migrations(&db).await.unwrap();

    let outcome = db
        .query("CREATE account SET owner = 'alice', balance = 0, currency = 'GBP'")
        .await
        .and_then(|r| r.check());
    assert!(outcome.is_err(), "GBP must fail the currency assertion");
}

#[tokio::test]
async fn connect_through_manager_with_embedded_url() {
    let config = mybank_db::DbConfig {
        url: "mem://".into(),
        ..Default::default()
    };
    let manager = mybank_db::DbManager::connect(&config).await.unwrap();
    assert_eq!(mybank_db::run_migrations(manager.client()).await.unwrap(), 1);
}
