use super::*;
use adb_db::DuckDbBackend;
use std::sync::Mutex;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<CommitEvent>>,
}

impl ChangeListener for Recorder {
    fn on_commit(&self, event: &CommitEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_commit_notifies_marked_changes() {
    let db = DuckDbBackend::in_memory().unwrap();
    let recorder = Arc::new(Recorder::default());
    let listeners: Vec<Arc<dyn ChangeListener>> = vec![recorder.clone()];

    let lock = db.lock(LockId(1234)).await.unwrap();
    let mut session = BootstrapSession::begin(&db, &lock, &listeners).await.unwrap();
    session
        .conn()
        .execute_batch("CREATE TABLE idea (id INTEGER)")
        .await
        .unwrap();
    session.mark_changed(ChangeKind::SchemaCreated, Some(SchemaRevision::new("head")));
    assert!(session.is_changed());

    let events = session.commit().await.unwrap();
    lock.release().await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::SchemaCreated);
    assert_eq!(events[0].lock_id, LockId(1234));
    assert_eq!(*recorder.events.lock().unwrap(), events);
}

#[tokio::test]
async fn test_commit_without_changes_is_silent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let recorder = Arc::new(Recorder::default());
    let listeners: Vec<Arc<dyn ChangeListener>> = vec![recorder.clone()];

    let lock = db.lock(LockId(1235)).await.unwrap();
    let session = BootstrapSession::begin(&db, &lock, &listeners).await.unwrap();
    assert!(!session.is_changed());
    assert!(session.commit().await.unwrap().is_empty());
    lock.release().await;

    assert!(recorder.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_finish_rolls_back_on_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let recorder = Arc::new(Recorder::default());
    let listeners: Vec<Arc<dyn ChangeListener>> = vec![recorder.clone()];

    let lock = db.lock(LockId(1235)).await.unwrap();
    let mut session = BootstrapSession::begin(&db, &lock, &listeners).await.unwrap();
    session
        .conn()
        .execute_batch("CREATE TABLE half_built (id INTEGER)")
        .await
        .unwrap();
    session.mark_changed(ChangeKind::Migrated, Some(SchemaRevision::new("rev2")));

    let result: MigrateResult<()> = Err(crate::MigrateError::NotInitialized {
        schema: "main".to_string(),
    });
    assert!(session.finish(result).await.is_err());
    lock.release().await;

    assert!(recorder.events.lock().unwrap().is_empty());
    let mut conn = db.connect().await.unwrap();
    let count = conn
        .query_i64(
            "SELECT COUNT(*) FROM information_schema.tables WHERE CAST(table_name AS VARCHAR) = 'half_built'",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_uncommitted_work_is_invisible_to_other_connections() {
    let db = DuckDbBackend::in_memory().unwrap();
    let lock = db.lock(LockId(1234)).await.unwrap();
    let mut session = BootstrapSession::begin(&db, &lock, &[]).await.unwrap();
    session
        .conn()
        .execute_batch("CREATE TABLE pending (id INTEGER)")
        .await
        .unwrap();

    let mut other = db.connect().await.unwrap();
    let visible = other
        .query_i64(
            "SELECT COUNT(*) FROM information_schema.tables WHERE CAST(table_name AS VARCHAR) = 'pending'",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(visible, 0);

    session.rollback().await;
    lock.release().await;
}

#[test]
fn test_logging_listener_accepts_events() {
    LoggingListener.on_commit(&CommitEvent {
        kind: ChangeKind::Seeded,
        revision: None,
        lock_id: LockId(1236),
        committed_at: Utc::now(),
    });
}
