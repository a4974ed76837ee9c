/// Persistence layer for thumbnail-service
///
/// `DataStore` carries the explicit primary/replica pool split; the
/// repository traits are the seams the orchestrator works against, with
/// Postgres implementations here and in-memory doubles in tests.
pub mod owner_repo;
pub mod store;
pub mod thumbnail_repo;

pub use store::DataStore;

use crate::error::Result;
use crate::models::{OwnerHandle, OwnerRef, ThumbnailFormat, ThumbnailRecord};
use async_trait::async_trait;

/// Persistence boundary for thumbnail records.
#[async_trait]
pub trait ThumbnailStore: Send + Sync {
    /// Look up an existing derivative. Served from the replica; `None` is
    /// not an error. Returns the oldest match if duplicates exist.
    async fn find_existing(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
    ) -> Result<Option<ThumbnailRecord>>;

    /// Persist a new derivative row. Runs against the primary only.
    async fn create(
        &self,
        owner: &OwnerRef,
        size: i32,
        format: Option<ThumbnailFormat>,
        storage_path: &str,
    ) -> Result<ThumbnailRecord>;
}

/// Lookup boundary for owner entities.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    /// Load the owner entity behind a reference, with its source-image path.
    async fn find(&self, owner: &OwnerRef) -> Result<Option<OwnerHandle>>;
}
