//! Thumbnail Service
//!
//! Resolve-or-generate-and-cache pipeline for image derivatives: requests
//! name an owner entity, a pixel size and an optional format; the service
//! redirects to an existing derivative or generates, persists and records a
//! new one.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
