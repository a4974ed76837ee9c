//! End-to-end resolve flow over in-memory collaborators.
//!
//! Exercises the orchestrator's full state machine without Postgres or a
//! filesystem: cache miss generation, cache hit idempotence, the
//! full-resolution passthrough, and every terminal failure branch.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use thumbnail_service::db::{OwnerDirectory, ThumbnailStore};
use thumbnail_service::error::{AppError, Result};
use thumbnail_service::events::{EventPublisher, ThumbnailCreatedEvent};
use thumbnail_service::models::{
    OwnerHandle, OwnerKey, OwnerKind, OwnerRef, ThumbnailFormat, ThumbnailRecord,
};
use thumbnail_service::services::ids::encode_global_id;
use thumbnail_service::services::ThumbnailService;
use thumbnail_service::storage::MediaStorage;
use uuid::Uuid;

// ========================================
// In-memory collaborators
// ========================================

#[derive(Default)]
struct MemThumbnailStore {
    rows: Mutex<Vec<ThumbnailRecord>>,
    fail_create: bool,
}

impl MemThumbnailStore {
    fn failing() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_create: true,
        }
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn matches_triple(
    row: &ThumbnailRecord,
    owner: &OwnerRef,
    size: i32,
    format: Option<ThumbnailFormat>,
) -> bool {
    row.owner_type == owner.kind.as_str()
        && row.owner_id == owner.key.as_id()
        && row.owner_uuid == owner.key.as_uuid()
        && row.size == size
        && row.format.as_deref() == format.map(|f| f.as_str())
}

#[async_trait]
impl ThumbnailStore for MemThumbnailStore {
    async fn find_existing(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
    ) -> Result<Option<ThumbnailRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|row| matches_triple(row, owner, size, format))
            .cloned())
    }

    async fn create(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
        storage_path: &str,
    ) -> Result<ThumbnailRecord> {
        if self.fail_create {
            return Err(AppError::DatabaseError("disk full".to_string()));
        }

        let record = ThumbnailRecord {
            id: Uuid::new_v4(),
            owner_type: owner.kind.as_str().to_string(),
            owner_id: owner.key.as_id(),
            owner_uuid: owner.key.as_uuid(),
            size,
            format: format.map(|f| f.as_str().to_string()),
            storage_path: storage_path.to_string(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
struct MemOwnerDirectory {
    owners: Vec<OwnerHandle>,
}

impl MemOwnerDirectory {
    fn with(mut self, owner: OwnerRef, image_path: Option<&str>) -> Self {
        self.owners.push(OwnerHandle {
            owner,
            image_path: image_path.map(String::from),
        });
        self
    }
}

#[async_trait]
impl OwnerDirectory for MemOwnerDirectory {
    async fn find(&self, owner: &OwnerRef) -> Result<Option<OwnerHandle>> {
        Ok(self.owners.iter().find(|h| h.owner == *owner).cloned())
    }
}

#[derive(Default)]
struct MemStorage {
    files: Mutex<HashMap<String, Bytes>>,
    writes: AtomicUsize,
}

impl MemStorage {
    fn with_file(self, path: &str, data: Vec<u8>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::from(data));
        self
    }

    fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaStorage for MemStorage {
    async fn read(&self, path: &str) -> Result<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::SourceMissing("Cannot find image file.".to_string()))
    }

    async fn write(&self, path: &str, data: Bytes, _content_type: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.files.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://media.test/{}", path.trim_start_matches('/'))
    }
}

#[derive(Default)]
struct CountingPublisher {
    published: AtomicUsize,
}

#[async_trait]
impl EventPublisher for CountingPublisher {
    async fn thumbnail_created(&self, event: &ThumbnailCreatedEvent) -> anyhow::Result<()> {
        assert!(!event.record.storage_path.is_empty());
        assert_eq!(event.owner.owner.kind.as_str(), event.record.owner_type);
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ========================================
// Fixtures
// ========================================

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([10, 120, 60]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

struct Harness {
    store: Arc<MemThumbnailStore>,
    storage: Arc<MemStorage>,
    events: Arc<CountingPublisher>,
    service: ThumbnailService,
}

fn harness(owners: MemOwnerDirectory, storage: MemStorage) -> Harness {
    harness_with_store(MemThumbnailStore::default(), owners, storage)
}

fn harness_with_store(
    store: MemThumbnailStore,
    owners: MemOwnerDirectory,
    storage: MemStorage,
) -> Harness {
    let store = Arc::new(store);
    let storage = Arc::new(storage);
    let events = Arc::new(CountingPublisher::default());
    let service = ThumbnailService::new(
        store.clone(),
        Arc::new(owners),
        storage.clone(),
        events.clone(),
    );
    Harness {
        store,
        storage,
        events,
        service,
    }
}

fn category_ref(id: i64) -> OwnerRef {
    OwnerRef::new(OwnerKind::Category, OwnerKey::Id(id))
}

// ========================================
// Tests
// ========================================

#[tokio::test]
async fn miss_generates_record_and_redirects() {
    let owners = MemOwnerDirectory::default().with(
        category_ref(7),
        Some("category-backgrounds/background.png"),
    );
    let storage = MemStorage::default()
        .with_file("category-backgrounds/background.png", png_bytes(800, 600));
    let h = harness(owners, storage);

    let target = h
        .service
        .resolve(&encode_global_id("Category", "7"), "60", None)
        .await
        .unwrap();

    assert_eq!(
        target.url,
        "http://media.test/thumbnails/category-backgrounds/background_thumbnail_64.png"
    );
    assert_eq!(h.store.len(), 1);
    let record = h
        .store
        .find_existing(&category_ref(7), 64, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.size, 64);
    assert_eq!(record.format, None);
    assert_eq!(h.events.published.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_call_is_cache_hit() {
    let owners = MemOwnerDirectory::default().with(
        category_ref(7),
        Some("category-backgrounds/background.png"),
    );
    let storage = MemStorage::default()
        .with_file("category-backgrounds/background.png", png_bytes(800, 600));
    let h = harness(owners, storage);

    let first = h
        .service
        .resolve(&encode_global_id("Category", "7"), "60", None)
        .await
        .unwrap();
    let writes_after_first = h.storage.write_count();

    let second = h
        .service
        .resolve(&encode_global_id("Category", "7"), "60", None)
        .await
        .unwrap();

    // Idempotent: byte-identical redirect, no second generation or record.
    assert_eq!(first, second);
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.storage.write_count(), writes_after_first);
    assert_eq!(h.events.published.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn same_basename_owners_get_distinct_derivatives() {
    let category = category_ref(7);
    let collection = OwnerRef::new(OwnerKind::Collection, OwnerKey::Id(9));
    let owners = MemOwnerDirectory::default()
        .with(category, Some("category-backgrounds/bg.png"))
        .with(collection, Some("collection-backgrounds/bg.png"));
    let storage = MemStorage::default()
        .with_file("category-backgrounds/bg.png", png_bytes(800, 600))
        .with_file("collection-backgrounds/bg.png", png_bytes(600, 800));
    let h = harness(owners, storage);

    let first = h
        .service
        .resolve(&encode_global_id("Category", "7"), "60", None)
        .await
        .unwrap();
    let second = h
        .service
        .resolve(&encode_global_id("Collection", "9"), "60", None)
        .await
        .unwrap();

    // Same basename, unrelated owners: neither derivative may shadow the
    // other, and each record keeps pointing at its own bytes.
    assert_ne!(first.url, second.url);
    assert_eq!(h.store.len(), 2);
    let category_record = h
        .store
        .find_existing(&category, 64, None)
        .await
        .unwrap()
        .unwrap();
    let collection_record = h
        .store
        .find_existing(&collection, 64, None)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(category_record.storage_path, collection_record.storage_path);

    let category_bytes = h.storage.read(&category_record.storage_path).await.unwrap();
    let collection_bytes = h
        .storage
        .read(&collection_record.storage_path)
        .await
        .unwrap();
    use image::GenericImageView;
    let category_thumb = image::load_from_memory(&category_bytes).unwrap();
    let collection_thumb = image::load_from_memory(&collection_bytes).unwrap();
    assert_eq!(category_thumb.width(), 64);
    assert_eq!(collection_thumb.height(), 64);
}

#[tokio::test]
async fn size_zero_redirects_to_source_without_caching() {
    let user_uuid = Uuid::new_v4();
    let owner = OwnerRef::new(OwnerKind::User, OwnerKey::Uuid(user_uuid));
    let owners = MemOwnerDirectory::default().with(owner, Some("avatars/image.jpg"));
    let storage = MemStorage::default().with_file("avatars/image.jpg", png_bytes(100, 100));
    let h = harness(owners, storage);

    let target = h
        .service
        .resolve(&encode_global_id("User", &user_uuid.to_string()), "0", None)
        .await
        .unwrap();

    assert_eq!(target.url, "http://media.test/avatars/image.jpg");
    assert_eq!(h.store.len(), 0);
    assert_eq!(h.storage.write_count(), 0);
}

#[tokio::test]
async fn webp_format_changes_derivative_extension() {
    let user_uuid = Uuid::new_v4();
    let owner = OwnerRef::new(OwnerKind::User, OwnerKey::Uuid(user_uuid));
    let owners = MemOwnerDirectory::default().with(owner, Some("avatars/avatar.png"));
    let storage = MemStorage::default().with_file("avatars/avatar.png", png_bytes(400, 400));
    let h = harness(owners, storage);

    let target = h
        .service
        .resolve(
            &encode_global_id("User", &user_uuid.to_string()),
            "120",
            Some("webp"),
        )
        .await
        .unwrap();

    assert_eq!(
        target.url,
        "http://media.test/thumbnails/avatars/avatar_thumbnail_128.webp"
    );
    let record = h
        .store
        .find_existing(&owner, 128, Some(ThumbnailFormat::Webp))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.format.as_deref(), Some("webp"));
}

#[tokio::test]
async fn unsupported_type_is_rejected() {
    let h = harness(MemOwnerDirectory::default(), MemStorage::default());

    let err = h
        .service
        .resolve(&encode_global_id("Order", "17"), "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedType(_)));
    assert_eq!(err.to_string(), "Invalid instance type.");
}

#[tokio::test]
async fn garbage_id_is_rejected() {
    let h = harness(MemOwnerDirectory::default(), MemStorage::default());

    let err = h
        .service
        .resolve("!!!not-base64!!!", "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidId(_)));
}

#[tokio::test]
async fn unparseable_size_is_rejected() {
    let h = harness(MemOwnerDirectory::default(), MemStorage::default());

    let err = h
        .service
        .resolve(&encode_global_id("Category", "7"), "huge", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSize(_)));
}

#[tokio::test]
async fn avif_is_rejected_for_icon_owners() {
    let app_uuid = Uuid::new_v4();
    let owner = OwnerRef::new(OwnerKind::App, OwnerKey::Uuid(app_uuid));
    let owners = MemOwnerDirectory::default().with(owner, Some("app-brand/logo.png"));
    let storage = MemStorage::default().with_file("app-brand/logo.png", png_bytes(512, 512));
    let h = harness(owners, storage);

    let err = h
        .service
        .resolve(
            &encode_global_id("App", &app_uuid.to_string()),
            "64",
            Some("avif"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedFormat(_)));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn missing_owner_is_not_found() {
    let h = harness(MemOwnerDirectory::default(), MemStorage::default());

    let err = h
        .service
        .resolve(&encode_global_id("Category", "99"), "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OwnerNotFound(_)));
    assert_eq!(err.to_string(), "Instance not found.");
}

#[tokio::test]
async fn owner_without_image_is_rejected() {
    let owners = MemOwnerDirectory::default().with(category_ref(7), None);
    let h = harness(owners, MemStorage::default());

    let err = h
        .service
        .resolve(&encode_global_id("Category", "7"), "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoSourceImage(_)));
    assert_eq!(err.to_string(), "There is no image for provided instance.");
}

#[tokio::test]
async fn missing_source_file_is_rejected() {
    let owners =
        MemOwnerDirectory::default().with(category_ref(7), Some("category-backgrounds/gone.png"));
    let h = harness(owners, MemStorage::default());

    let err = h
        .service
        .resolve(&encode_global_id("Category", "7"), "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SourceMissing(_)));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn undecodable_source_is_rejected() {
    let owners =
        MemOwnerDirectory::default().with(category_ref(7), Some("category-backgrounds/bad.png"));
    let storage = MemStorage::default()
        .with_file("category-backgrounds/bad.png", b"not an image".to_vec());
    let h = harness(owners, storage);

    let err = h
        .service
        .resolve(&encode_global_id("Category", "7"), "64", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSourceImage(_)));
}

#[tokio::test]
async fn store_write_failure_propagates() {
    let owners = MemOwnerDirectory::default().with(
        category_ref(7),
        Some("category-backgrounds/background.png"),
    );
    let storage = MemStorage::default()
        .with_file("category-backgrounds/background.png", png_bytes(800, 600));
    let h = harness_with_store(MemThumbnailStore::failing(), owners, storage);

    let err = h
        .service
        .resolve(&encode_global_id("Category", "7"), "60", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
    assert_eq!(h.events.published.load(Ordering::SeqCst), 0);
}
