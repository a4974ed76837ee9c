/// Thumbnail repository - database operations for thumbnail records
///
/// No unique constraint guards (owner, size, format): two concurrent misses
/// may both insert, which wastes one generation but corrupts nothing. Reads
/// order by creation time so every later lookup converges on the same row.
use crate::db::{DataStore, ThumbnailStore};
use crate::error::Result;
use crate::models::{OwnerRef, ThumbnailFormat, ThumbnailRecord};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Look up an existing derivative row for the triple, oldest first.
pub async fn find_existing(
    pool: &PgPool,
    owner: &OwnerRef,
    size: i32,
    format: Option<ThumbnailFormat>,
) -> Result<Option<ThumbnailRecord>> {
    let record = sqlx::query_as::<_, ThumbnailRecord>(
        r#"
        SELECT id, owner_type, owner_id, owner_uuid, size, format, storage_path, created_at
        FROM thumbnails
        WHERE owner_type = $1
          AND owner_id IS NOT DISTINCT FROM $2
          AND owner_uuid IS NOT DISTINCT FROM $3
          AND size = $4
          AND format IS NOT DISTINCT FROM $5
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(owner.kind.as_str())
    .bind(owner.key.as_id())
    .bind(owner.key.as_uuid())
    .bind(size)
    .bind(format.map(|f| f.as_str()))
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Insert a new derivative row and return it.
pub async fn create(
    pool: &PgPool,
    owner: &OwnerRef,
    size: i32,
    format: Option<ThumbnailFormat>,
    storage_path: &str,
) -> Result<ThumbnailRecord> {
    let record = sqlx::query_as::<_, ThumbnailRecord>(
        r#"
        INSERT INTO thumbnails (id, owner_type, owner_id, owner_uuid, size, format, storage_path)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, owner_type, owner_id, owner_uuid, size, format, storage_path, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner.kind.as_str())
    .bind(owner.key.as_id())
    .bind(owner.key.as_uuid())
    .bind(size)
    .bind(format.map(|f| f.as_str()))
    .bind(storage_path)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Postgres-backed `ThumbnailStore` over the explicit primary/replica split.
pub struct PgThumbnailStore {
    store: DataStore,
}

impl PgThumbnailStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ThumbnailStore for PgThumbnailStore {
    async fn find_existing(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
    ) -> Result<Option<ThumbnailRecord>> {
        find_existing(self.store.reader(), owner, size, format).await
    }

    async fn create(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
        storage_path: &str,
    ) -> Result<ThumbnailRecord> {
        create(self.store.writer(), owner, size, format, storage_path).await
    }
}
