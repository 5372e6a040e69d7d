//! Task service tests — the four operations against a real SQLite store.

use taskdeck::storage::Storage;
use taskdeck::tasks::TaskService;

async fn make_service() -> (TaskService, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(dir.path()).await.expect("storage");
    (TaskService::new(storage.pool()), dir)
}

#[tokio::test]
async fn create_then_list_returns_the_new_task() {
    let (svc, _dir) = make_service().await;

    let created = svc.create("Buy milk", "2024-06-01").await.unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.task_date, "2024-06-01");
    assert!(!created.completed);

    let tasks = svc.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0], created);
}

#[tokio::test]
async fn list_orders_newest_first() {
    let (svc, _dir) = make_service().await;

    svc.create("first", "2024-06-01").await.unwrap();
    svc.create("second", "2024-06-01").await.unwrap();
    let third = svc.create("third", "2024-06-02").await.unwrap();

    let tasks = svc.list().await.unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0], third);
    assert_eq!(tasks[2].title, "first");
}

#[tokio::test]
async fn toggle_twice_returns_to_original_state() {
    let (svc, _dir) = make_service().await;
    let created = svc.create("Buy milk", "2024-06-01").await.unwrap();

    let once = svc.toggle(created.id).await.unwrap().expect("row exists");
    assert!(once.completed);
    assert_eq!(once.id, created.id);
    assert_eq!(once.title, created.title);

    let twice = svc.toggle(created.id).await.unwrap().expect("row exists");
    assert!(!twice.completed);
}

#[tokio::test]
async fn toggle_missing_id_is_a_no_op() {
    let (svc, _dir) = make_service().await;
    assert!(svc.toggle(999).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_removes_exactly_one_row() {
    let (svc, _dir) = make_service().await;
    let keep = svc.create("keep", "2024-06-01").await.unwrap();
    let gone = svc.create("gone", "2024-06-01").await.unwrap();

    svc.delete(gone.id).await.unwrap();

    let tasks = svc.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, keep.id);

    // Deleting an id that no longer exists still succeeds.
    svc.delete(gone.id).await.unwrap();
    assert_eq!(svc.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn full_lifecycle_scenario() {
    let (svc, _dir) = make_service().await;

    let created = svc.create("Buy milk", "2024-06-01").await.unwrap();
    assert_eq!(created.id, 1);

    let toggled = svc.toggle(1).await.unwrap().unwrap();
    assert!(toggled.completed);

    svc.delete(1).await.unwrap();
    assert!(svc.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn task_date_is_coerced_to_iso_form() {
    let (svc, _dir) = make_service().await;

    // Unpadded components still parse but always read back padded.
    let created = svc.create("dentist", "2024-6-1").await.unwrap();
    assert_eq!(created.task_date, "2024-06-01");

    let tasks = svc.list().await.unwrap();
    assert_eq!(tasks[0].task_date, "2024-06-01");
}

#[tokio::test]
async fn unparseable_date_is_rejected_before_the_write() {
    let (svc, _dir) = make_service().await;
    assert!(svc.create("bad", "june first").await.is_err());
    assert!(svc.list().await.unwrap().is_empty());
}
