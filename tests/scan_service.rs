mod support;

use scan_history::{
    models::{barcode::ScanKind, metadata::MetadataRecord},
    services::{
        csv_export::CsvVariant,
        events::StoreEvent,
        export_service::{ExportLocation, ExportOutcome},
        snapshot_repo::{STORE_BLOB_NAME, SnapshotRepository},
    },
};
use support::{file_pool, memory_pool, service_on};
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

fn tag_info() -> MetadataRecord {
    MetadataRecord {
        animal_id: Some("AT 1234 5678".into()),
        breed: Some("Fleckvieh".into()),
        notes: Some("hello, world".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn bound_metadata_reattaches_on_later_scans() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;

    let first = service.add_item("https://herd.example/cow/42", "qr").await;
    assert!(first.metadata.is_none());

    let updated = service.update_item(first.id, Some(tag_info())).await.unwrap();
    assert_eq!(updated.metadata, Some(tag_info()));
    assert!(updated.last_modified.is_some());

    let second = service.add_item("https://herd.example/cow/42", "qr").await;
    assert_eq!(second.metadata, Some(tag_info()));
    assert_eq!(
        service.binding("https://herd.example/cow/42").await,
        Some(tag_info())
    );
}

#[tokio::test]
async fn cleared_metadata_is_not_reattached() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;

    let entry = service.add_item("abc", "qr").await;
    service.update_item(entry.id, Some(tag_info())).await;
    service.update_item(entry.id, None).await;

    assert!(service.binding("abc").await.is_none());
    assert!(service.add_item("abc", "qr").await.metadata.is_none());
}

#[tokio::test]
async fn state_survives_restart_and_clear_keeps_bindings() {
    let dir = tempfile::tempdir().unwrap();

    let first_run = service_on(file_pool(dir.path()).await, &dir).await;
    let entry = first_run.add_item("abc", "qr").await;
    first_run.update_item(entry.id, Some(tag_info())).await;
    first_run.add_item("040000111", "ean13").await;
    assert!(!first_run.persistence_degraded());

    let second_run = service_on(file_pool(dir.path()).await, &dir).await;
    let items = second_run.items().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].content, "040000111");
    assert_eq!(items[1].metadata, Some(tag_info()));

    second_run.clear_items().await;

    let third_run = service_on(file_pool(dir.path()).await, &dir).await;
    assert!(third_run.items().await.is_empty());
    assert_eq!(third_run.add_item("abc", "qr").await.metadata, Some(tag_info()));
}

#[tokio::test]
async fn corrupt_snapshot_is_kept_aside_before_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let repo = SnapshotRepository::new(pool.clone());
    repo.ensure_schema().await.unwrap();
    let body = r#"{"items":[{"id":"6f1c1f0e-8a55-4a34-9e1a-2f5b1c7d9a10","content":"abc","originalContent":"abc","capturedAt":"2025-01-01T10:00:00Z","displayDate":"01.01.2025, 11:00:00","barcodeType":"qr","metadata":{"weight":420}}],"bindingTable":{"abc":{"weight":420}}}"#;
    sqlx::query("INSERT INTO kv_blobs (name, body, updated_at) VALUES (?, ?, ?)")
        .bind(STORE_BLOB_NAME)
        .bind(body)
        .bind(chrono::Utc::now())
        .execute(&*pool)
        .await
        .unwrap();

    let service = service_on(pool.clone(), &dir).await;
    assert!(service.items().await.is_empty());

    service.add_item("new", "qr").await;
    assert!(!service.persistence_degraded());
    assert_eq!(repo.load().await.unwrap().map(|s| s.len()), Some(1));

    let side: String = sqlx::query_scalar("SELECT name FROM kv_blobs WHERE name LIKE ?")
        .bind(format!("{STORE_BLOB_NAME}.corrupt-%"))
        .fetch_one(&*pool)
        .await
        .unwrap();
    let kept = SnapshotRepository::with_name(pool, side);
    assert_eq!(kept.load_raw().await.unwrap().as_deref(), Some(body));
}

#[tokio::test]
async fn unreadable_snapshot_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();

    let first_run = service_on(file_pool(dir.path()).await, &dir).await;
    first_run.add_item("abc", "qr").await;

    let closed = file_pool(dir.path()).await;
    closed.close().await;
    let second_run = service_on(closed, &dir).await;
    assert!(second_run.persistence_degraded());
    assert!(second_run.items().await.is_empty());
    second_run.add_item("other", "qr").await;
    assert!(second_run.persistence_degraded());

    let third_run = service_on(file_pool(dir.path()).await, &dir).await;
    let items = third_run.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "abc");
}

#[tokio::test]
async fn closed_database_degrades_to_memory_only() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let service = service_on(pool.clone(), &dir).await;
    assert!(!service.persistence_degraded());

    pool.close().await;

    let entry = service.add_item("abc", "qr").await;
    service.update_item(entry.id, Some(tag_info())).await;
    assert!(service.persistence_degraded());
    assert_eq!(service.items().await.len(), 1);
    assert_eq!(service.add_item("abc", "qr").await.metadata, Some(tag_info()));
}

#[tokio::test]
async fn removing_unknown_id_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;
    service.add_item("abc", "qr").await;

    let mut events = service.subscribe();
    service.remove_item(Uuid::new_v4()).await;
    assert!(service.update_item(Uuid::new_v4(), Some(tag_info())).await.is_none());

    assert_eq!(service.items().await.len(), 1);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn subscribers_see_every_command() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;
    let mut events = service.subscribe();

    let entry = service.add_item("abc", "qr").await;
    service.update_item(entry.id, Some(tag_info())).await;
    service.remove_item(entry.id).await;
    service.clear_items().await;

    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::ItemAdded {
            id: entry.id,
            content: "abc".into()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::ItemUpdated {
            id: entry.id,
            content: "abc".into(),
            bound: true
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::ItemRemoved { id: entry.id }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::ItemsCleared { removed: 0 }
    );
}

#[tokio::test]
async fn listing_filters_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;
    service.add_item("q", "qr").await;
    service.add_item("e1", "ean13").await;
    service.add_item("e2", "code39").await;

    let listing = service.list(ScanKind::EarTag).await;
    let contents: Vec<&str> = listing.items.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["e2", "e1"]);
    assert_eq!(listing.counts.all, 3);
    assert_eq!(listing.counts.qr, 1);
    assert_eq!(listing.counts.ear_tag, 2);
}

#[tokio::test]
async fn export_writes_current_history() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_on(memory_pool().await, &dir).await;
    let entry = service.add_item("abc", "qr").await;
    service.update_item(entry.id, Some(tag_info())).await;
    service.add_item("040123456789", "code128").await;

    let outcome = service.export_to_file(CsvVariant::Enriched).await.unwrap();
    let ExportOutcome::Written { path, location, rows } = outcome else {
        panic!("export skipped");
    };
    assert_eq!(location, ExportLocation::Preferred);
    assert_eq!(rows, 2);

    let csv = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").collect();
    assert!(lines[1].starts_with("abc,QR-Code,"));
    assert!(lines[1].ends_with(",\"hello, world\""));
    assert!(lines[2].starts_with("AT123456789,CODE128,"));

    let again = service.render_export(CsvVariant::Enriched).await.unwrap().unwrap();
    assert_eq!(again.csv, csv);
}
