//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    folio_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "resource",
        "share",
        "department",
        "directory_user",
        "project_member",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    folio_db::run_migrations(&db).await.unwrap();
    folio_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn share_role_is_constrained() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    folio_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE share SET resource_id = 'r', user_id = 'u', \
             role = 'none'",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "share role 'none' must be rejected");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_share_pairs() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    folio_db::run_migrations(&db).await.unwrap();

    db.query("CREATE share SET resource_id = 'r', user_id = 'u', role = 'viewer'")
        .await
        .unwrap()
        .check()
        .unwrap();

    let result = db
        .query("CREATE share SET resource_id = 'r', user_id = 'u', role = 'editor'")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "duplicate (resource, user) pair should fail");
}
