use super::*;
use crate::seed::VocabularySeed;
use adb_core::config::VocabularyConfig;
use adb_core::MigrationScript;
use adb_db::DuckDbBackend;
use BootstrapState::*;

const V1_SCHEMA: &str = "CREATE TABLE role (name VARCHAR);";
const V2_SCHEMA: &str = "CREATE TABLE role (name VARCHAR);
CREATE TABLE discussion (id INTEGER);";

fn v1() -> Arc<MigrationHistory> {
    Arc::new(
        MigrationHistory::from_scripts(
            V1_SCHEMA,
            vec![MigrationScript::new("rev1", &[], V1_SCHEMA)],
        )
        .unwrap(),
    )
}

fn v2() -> Arc<MigrationHistory> {
    Arc::new(
        MigrationHistory::from_scripts(
            V2_SCHEMA,
            vec![
                MigrationScript::new("rev1", &[], V1_SCHEMA),
                MigrationScript::new("rev2", &["rev1"], "CREATE TABLE discussion (id INTEGER);"),
            ],
        )
        .unwrap(),
    )
}

fn orchestrator(db: &Arc<DuckDbBackend>, history: Arc<MigrationHistory>) -> Orchestrator {
    Orchestrator::new(db.clone(), history, BootstrapSettings::new("main"))
}

fn roles() -> Arc<dyn SeedHook> {
    Arc::new(VocabularySeed::new(vec![VocabularyConfig {
        table: "role".to_string(),
        column: "name".to_string(),
        values: vec!["r:sysadmin".to_string(), "r:participant".to_string()],
    }]))
}

#[tokio::test]
async fn test_fresh_bootstrap_creates_at_head() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let result = orchestrator(&db, v2()).bootstrap_to_head().await.unwrap();

    assert_eq!(
        result.outcome,
        BootstrapOutcome::Created {
            revision: SchemaRevision::new("rev2")
        }
    );
    assert_eq!(
        result.transitions,
        vec![Uninitialized, LockAcquiredForCreate, SchemaCreated, LockReleased]
    );
}

#[tokio::test]
async fn test_second_bootstrap_takes_no_lock() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let orch = orchestrator(&db, v2());
    orch.bootstrap_to_head().await.unwrap();

    let again = orch.bootstrap_to_head().await.unwrap();
    assert_eq!(
        again.outcome,
        BootstrapOutcome::AlreadyCurrent {
            revision: SchemaRevision::new("rev2")
        }
    );
    assert_eq!(
        again.transitions,
        vec![Uninitialized, RevisionChecked, AlreadyCurrent]
    );
}

#[tokio::test]
async fn test_existing_schema_is_migrated() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    orchestrator(&db, v1()).bootstrap_to_head().await.unwrap();

    let result = orchestrator(&db, v2()).bootstrap_to_head().await.unwrap();
    assert_eq!(
        result.outcome,
        BootstrapOutcome::Migrated {
            from: SchemaRevision::new("rev1"),
            to: SchemaRevision::new("rev2"),
            applied: vec![SchemaRevision::new("rev2")],
        }
    );
    assert_eq!(
        result.transitions,
        vec![
            Uninitialized,
            RevisionChecked,
            LockAcquiredForMigrate,
            RevisionRecheckedUnderLock,
            MigrationRan,
            LockReleased,
        ]
    );
}

#[tokio::test]
async fn test_returned_session_is_usable() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut result = orchestrator(&db, v2()).bootstrap_to_head().await.unwrap();

    result
        .session
        .execute("INSERT INTO role (name) VALUES ($1)", &["r:owner"])
        .await
        .unwrap();
    assert_eq!(
        result
            .session
            .query_i64("SELECT COUNT(*) FROM role", &[])
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_behind_without_auto_migrate() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    orchestrator(&db, v1()).bootstrap_to_head().await.unwrap();

    let mut settings = BootstrapSettings::new("main");
    settings.auto_migrate = false;
    let orch = Orchestrator::new(db.clone(), v2(), settings);

    let result = orch.bootstrap_to_head().await.unwrap();
    assert_eq!(
        result.outcome,
        BootstrapOutcome::Behind {
            current: SchemaRevision::new("rev1"),
            target: SchemaRevision::new("rev2"),
        }
    );
    assert_eq!(orch.current_revision().await.unwrap(), Some(SchemaRevision::new("rev1")));
}

#[tokio::test]
async fn test_unversioned_tables_are_left_alone() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut conn = db.connect().await.unwrap();
    conn.execute_batch("CREATE TABLE legacy_a (id INTEGER); CREATE TABLE legacy_b (id INTEGER);")
        .await
        .unwrap();

    let result = orchestrator(&db, v2()).bootstrap_to_head().await.unwrap();
    assert_eq!(result.outcome, BootstrapOutcome::Unversioned);
    assert!(!result.outcome.changed_schema());
}

#[tokio::test]
async fn test_unknown_target_is_rejected() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let err = orchestrator(&db, v2())
        .bootstrap(&SchemaRevision::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::Core(CoreError::UnknownRevision { .. })));
}

#[tokio::test]
async fn test_database_ahead_of_code_is_an_error() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    orchestrator(&db, v2()).bootstrap_to_head().await.unwrap();

    let err = orchestrator(&db, v1()).bootstrap_to_head().await.unwrap_err();
    assert!(matches!(err, MigrateError::Core(CoreError::UnknownRevision { .. })));
}

#[tokio::test]
async fn test_seed_hook_runs_on_create() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let result = orchestrator(&db, v2())
        .with_seed_hook(roles())
        .bootstrap_to_head()
        .await
        .unwrap();
    assert!(result.outcome.changed_schema());

    let mut conn = db.connect().await.unwrap();
    assert_eq!(conn.query_i64("SELECT COUNT(*) FROM role", &[]).await.unwrap(), 2);
}

#[tokio::test]
async fn test_seed_disabled_on_create() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut settings = BootstrapSettings::new("main");
    settings.seed = false;
    Orchestrator::new(db.clone(), v2(), settings)
        .with_seed_hook(roles())
        .bootstrap_to_head()
        .await
        .unwrap();

    let mut conn = db.connect().await.unwrap();
    assert_eq!(conn.query_i64("SELECT COUNT(*) FROM role", &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_populate_seed_data_on_live_schema() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut settings = BootstrapSettings::new("main");
    settings.seed = false;
    let orch = Orchestrator::new(db.clone(), v2(), settings).with_seed_hook(roles());
    orch.bootstrap_to_head().await.unwrap();

    assert_eq!(orch.populate_seed_data().await.unwrap(), 2);
    assert_eq!(orch.populate_seed_data().await.unwrap(), 0);
}

#[tokio::test]
async fn test_populate_seed_data_requires_schema() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let orch = orchestrator(&db, v2()).with_seed_hook(roles());
    let err = orch.populate_seed_data().await.unwrap_err();
    assert!(matches!(err, MigrateError::NotInitialized { .. }));
}

#[tokio::test]
async fn test_upgrade_requires_initialized_schema() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let err = orchestrator(&db, v2())
        .upgrade(&SchemaRevision::new("rev2"))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::NotInitialized { .. }));
}

#[tokio::test]
async fn test_stamp_then_upgrade() {
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut conn = db.connect().await.unwrap();
    conn.execute_batch(V1_SCHEMA).await.unwrap();
    conn.execute_batch("CREATE TABLE extra (id INTEGER)").await.unwrap();

    let orch = orchestrator(&db, v2());
    orch.stamp(&SchemaRevision::new("rev1")).await.unwrap();
    assert_eq!(orch.current_revision().await.unwrap(), Some(SchemaRevision::new("rev1")));

    let result = orch.upgrade(&SchemaRevision::new("rev2")).await.unwrap();
    assert!(matches!(result.outcome, BootstrapOutcome::Migrated { .. }));
}

#[test]
fn test_settings_from_config() {
    let config = load_config(
        r#"
name: assembl
database:
  type: duckdb
migrations:
  version_table: schema_version
locks:
  create: 10
  migrate: 11
  seed: 12
bootstrap:
  auto_migrate: false
"#,
    );

    let settings = BootstrapSettings::from_config(&config, "main");
    assert_eq!(settings.schema, "main");
    assert_eq!(settings.version_table, "schema_version");
    assert_eq!(settings.locks.migrate, LockId(11));
    assert!(!settings.auto_migrate);
    assert!(settings.seed);
    assert_eq!(
        settings.inspector().qualified_version_table(),
        "main.schema_version"
    );
}

fn load_config(yaml: &str) -> Config {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assembl-db.yml");
    std::fs::write(&path, yaml).unwrap();
    Config::load(&path).unwrap()
}
