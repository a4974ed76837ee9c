//! Thumbnail lifecycle events
//!
//! On successful generation the orchestrator publishes a
//! `ThumbnailCreatedEvent` carrying the new record and its owner as an
//! explicit value. Publishing is fire-and-forget from the resolve path's
//! perspective; failures are logged, never surfaced to the client.

use crate::models::{OwnerHandle, ThumbnailRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Payload published when a derivative has been generated and persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailCreatedEvent {
    pub record: ThumbnailRecord,
    pub owner: OwnerHandle,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn thumbnail_created(&self, event: &ThumbnailCreatedEvent) -> Result<()>;
}

/// Webhook publisher - POSTs event payloads as JSON to a configured endpoint.
pub struct WebhookPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookPublisher {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build webhook HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn thumbnail_created(&self, event: &ThumbnailCreatedEvent) -> Result<()> {
        let payload = json!({
            "event": "thumbnail_created",
            "thumbnail": event.record,
            "owner": event.owner,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("Failed to deliver thumbnail_created event")?;

        response
            .error_for_status()
            .context("thumbnail_created event rejected by subscriber")?;

        Ok(())
    }
}

/// Publisher used when no webhook endpoint is configured.
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn thumbnail_created(&self, _event: &ThumbnailCreatedEvent) -> Result<()> {
        Ok(())
    }
}
