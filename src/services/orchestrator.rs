//! Thumbnail orchestrator - the resolve-or-generate-and-cache pipeline
//!
//! Decodes the opaque owner id, validates format and size, consults the
//! repository, and on a miss loads the owner, generates the derivative,
//! persists it and publishes a creation event. Steps before the persist
//! perform no writes, so every early exit leaves no partial state and a
//! client retry of the same URL is the only retry mechanism needed.

use crate::db::{OwnerDirectory, ThumbnailStore};
use crate::error::{AppError, Result};
use crate::events::{EventPublisher, ThumbnailCreatedEvent};
use crate::models::{OwnerKey, OwnerKind, OwnerRef, RedirectTarget, ThumbnailFormat};
use crate::services::processor::ImageProcessor;
use crate::services::sizing::ResolvedSize;
use crate::services::{ids, naming, sizing};
use crate::storage::MediaStorage;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ThumbnailService {
    store: Arc<dyn ThumbnailStore>,
    owners: Arc<dyn OwnerDirectory>,
    storage: Arc<dyn MediaStorage>,
    events: Arc<dyn EventPublisher>,
    standard_processor: Arc<ImageProcessor>,
    icon_processor: Arc<ImageProcessor>,
}

impl ThumbnailService {
    pub fn new(
        store: Arc<dyn ThumbnailStore>,
        owners: Arc<dyn OwnerDirectory>,
        storage: Arc<dyn MediaStorage>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            owners,
            storage,
            events,
            standard_processor: Arc::new(ImageProcessor::standard()),
            icon_processor: Arc::new(ImageProcessor::icon()),
        }
    }

    /// Resolve a thumbnail request to the URL the client should be
    /// redirected to, generating and persisting the derivative on a miss.
    pub async fn resolve(
        &self,
        opaque_id: &str,
        requested_size: &str,
        requested_format: Option<&str>,
    ) -> Result<RedirectTarget> {
        let (type_name, raw_key) = ids::decode_global_id(opaque_id)?;

        let kind = OwnerKind::from_type_name(&type_name)
            .ok_or_else(|| AppError::UnsupportedType("Invalid instance type.".to_string()))?;

        let format = parse_format(kind, requested_format)?;
        let size = sizing::parse_size(requested_size)?;
        let owner = OwnerRef::new(kind, parse_owner_key(kind, &raw_key)?);

        let bucket = match size {
            // Full-resolution requests redirect to the source file itself;
            // no derivative row is ever cached for them.
            ResolvedSize::Original => {
                let source_path = self.source_image_path(&owner).await?;
                return Ok(RedirectTarget {
                    url: self.storage.public_url(&source_path),
                });
            }
            ResolvedSize::Bucket(px) => px as i32,
        };

        if let Some(existing) = self.store.find_existing(&owner, bucket, format).await? {
            return Ok(RedirectTarget {
                url: self.storage.public_url(&existing.storage_path),
            });
        }

        let handle = self
            .owners
            .find(&owner)
            .await?
            .ok_or_else(|| AppError::OwnerNotFound("Instance not found.".to_string()))?;

        let source_path = handle.image_path.clone().ok_or_else(|| {
            AppError::NoSourceImage("There is no image for provided instance.".to_string())
        })?;

        let source = self.storage.read(&source_path).await?;

        let processor = if kind.is_icon() {
            self.icon_processor.clone()
        } else {
            self.standard_processor.clone()
        };
        let processed = processor
            .create_thumbnail_async(source, size, format)
            .await?;

        let storage_path = naming::derivative_path(&source_path, bucket as u32, processed.extension);
        self.storage
            .write(&storage_path, processed.data, processed.content_type)
            .await?;

        let record = self
            .store
            .create(&owner, bucket, format, &storage_path)
            .await?;

        info!(
            owner_type = kind.as_str(),
            owner_key = %owner.key,
            size = bucket,
            format = ?format.map(|f| f.as_str()),
            storage_path = %record.storage_path,
            "Thumbnail created"
        );

        let event = ThumbnailCreatedEvent {
            record: record.clone(),
            owner: handle,
        };
        if let Err(err) = self.events.thumbnail_created(&event).await {
            warn!(thumbnail_id = %record.id, "thumbnail_created event publish failed: {err:#}");
        }

        Ok(RedirectTarget {
            url: self.storage.public_url(&record.storage_path),
        })
    }

    /// Load the owner and return its source-image path, for the
    /// full-resolution path.
    async fn source_image_path(&self, owner: &OwnerRef) -> Result<String> {
        let handle = self
            .owners
            .find(owner)
            .await?
            .ok_or_else(|| AppError::OwnerNotFound("Instance not found.".to_string()))?;

        handle.image_path.ok_or_else(|| {
            AppError::NoSourceImage("There is no image for provided instance.".to_string())
        })
    }
}

/// Normalize and validate the optional format path segment for a kind.
fn parse_format(kind: OwnerKind, requested: Option<&str>) -> Result<Option<ThumbnailFormat>> {
    let Some(raw) = requested else {
        return Ok(None);
    };

    let format = ThumbnailFormat::from_str(&raw.to_lowercase())
        .ok_or_else(|| AppError::UnsupportedFormat("Unsupported image format.".to_string()))?;

    if !format.allowed_for(kind) {
        return Err(AppError::UnsupportedFormat(
            "Unsupported image format.".to_string(),
        ));
    }

    Ok(Some(format))
}

/// Parse the decoded raw key in the form the kind requires.
fn parse_owner_key(kind: OwnerKind, raw_key: &str) -> Result<OwnerKey> {
    if kind.uses_uuid() {
        let uuid = Uuid::parse_str(raw_key)
            .map_err(|_| AppError::InvalidId("Cannot decode the provided ID.".to_string()))?;
        Ok(OwnerKey::Uuid(uuid))
    } else {
        let id: i64 = raw_key
            .parse()
            .map_err(|_| AppError::InvalidId("Cannot decode the provided ID.".to_string()))?;
        Ok(OwnerKey::Id(id))
    }
}
