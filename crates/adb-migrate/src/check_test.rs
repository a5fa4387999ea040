use super::*;
use adb_core::{CoreError, MigrationScript};
use adb_db::{Connection, DuckDbBackend};

fn history() -> MigrationHistory {
    MigrationHistory::from_scripts(
        "",
        vec![
            MigrationScript::new("rev1", &[], "SELECT 1"),
            MigrationScript::new("rev2", &["rev1"], "SELECT 1"),
        ],
    )
    .unwrap()
}

async fn stamped(label: &str) -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    let mut conn = db.connect().await.unwrap();
    conn.execute_batch("CREATE TABLE alembic_version (version_num VARCHAR(32))")
        .await
        .unwrap();
    conn.execute("INSERT INTO alembic_version VALUES ($1)", &[label])
        .await
        .unwrap();
    db
}

fn inspector() -> SchemaInspector {
    SchemaInspector::new("main", "alembic_version")
}

#[tokio::test]
async fn test_up_to_date() {
    let db = stamped("rev2").await;
    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert!(status.is_up_to_date());
}

#[tokio::test]
async fn test_uninitialized() {
    let db = DuckDbBackend::in_memory().unwrap();
    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert_eq!(status, VersionStatus::Uninitialized);
}

#[tokio::test]
async fn test_tables_without_stamp_are_unversioned() {
    let db = DuckDbBackend::in_memory().unwrap();
    let mut conn = db.connect().await.unwrap();
    conn.execute_batch(
        "CREATE TABLE alembic_version (version_num VARCHAR(32));
         CREATE TABLE idea (id INTEGER);",
    )
    .await
    .unwrap();

    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert_eq!(status, VersionStatus::Unversioned);
}

#[tokio::test]
async fn test_empty_version_table_alone_is_uninitialized() {
    let db = DuckDbBackend::in_memory().unwrap();
    let mut conn = db.connect().await.unwrap();
    conn.execute_batch("CREATE TABLE alembic_version (version_num VARCHAR(32))")
        .await
        .unwrap();

    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert_eq!(status, VersionStatus::Uninitialized);
}

#[tokio::test]
async fn test_behind() {
    let db = stamped("rev1").await;
    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert_eq!(
        status,
        VersionStatus::Behind {
            database: SchemaRevision::new("rev1"),
            head: SchemaRevision::new("rev2"),
        }
    );
}

#[tokio::test]
async fn test_unknown_revision_is_diverged() {
    let db = stamped("from_the_future").await;
    let status = check_db_version(&db, &history(), &inspector()).await.unwrap();
    assert!(matches!(status, VersionStatus::Diverged { .. }));
}

#[tokio::test]
async fn test_multiple_heads_fail_before_inspection() {
    let db = DuckDbBackend::in_memory().unwrap();
    let forked = MigrationHistory::from_scripts(
        "",
        vec![
            MigrationScript::new("rev1", &[], "SELECT 1"),
            MigrationScript::new("a", &["rev1"], "SELECT 1"),
            MigrationScript::new("b", &["rev1"], "SELECT 1"),
        ],
    )
    .unwrap();

    let err = check_db_version(&db, &forked, &inspector()).await.unwrap_err();
    assert!(err.is_fatal_history());
    assert!(matches!(
        err,
        crate::MigrateError::Core(CoreError::MultipleHeads { .. })
    ));
}
