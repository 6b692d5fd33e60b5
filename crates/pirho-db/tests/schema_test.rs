//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn migrated() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pirho_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = migrated().await;

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "user",
        "product",
        "friendship",
        "session",
        "session_product",
        "participant",
        "answer",
        "session_invite",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = migrated().await;

    // Second run must be a no-op.
    pirho_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_answers() {
    let db = migrated().await;

    db.query(
        "CREATE answer SET participant_id = 'p1', product_id = 'x', \
         guessed_price = 10.0, score = 90",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let result = db
        .query(
            "CREATE answer SET participant_id = 'p1', product_id = 'x', \
             guessed_price = 12.0, score = 88",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "second answer for the pair should be rejected");
}

#[tokio::test]
async fn score_outside_bounds_is_rejected() {
    let db = migrated().await;

    let result = db
        .query(
            "CREATE answer SET participant_id = 'p1', product_id = 'x', \
             guessed_price = 10.0, score = 101",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err());
}

#[tokio::test]
async fn unknown_visibility_is_rejected() {
    let db = migrated().await;

    let result = db
        .query(
            "CREATE session SET name = 's', creator_id = 'u', status = 'active', \
             difficulty = 'easy', visibility = 'secret', max_participants = 2",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err());
}

#[tokio::test]
async fn manager_connects_to_embedded_store() {
    let manager = pirho_db::DbManager::connect(&pirho_db::DbConfig {
        url: "mem://".into(),
        ..Default::default()
    })
    .await
    .unwrap();

    let mut result = manager
        .client()
        .query("SELECT * FROM _migration")
        .await
        .unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1);
}
