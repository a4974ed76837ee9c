/// Configuration management for thumbnail-service
///
/// Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub events: EventsConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Read-replica connection URL; lookups run here. Falls back to `url`.
    pub replica_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MediaConfig {
    /// Filesystem root under which source images and derivatives live.
    pub root: String,
    /// Public base URL the redirect targets are built from.
    pub base_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventsConfig {
    /// Webhook endpoint for thumbnail-created events; events are disabled
    /// when unset.
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("THUMBNAIL_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("THUMBNAIL_SERVICE_PORT")
                    .unwrap_or_else(|_| "8086".to_string())
                    .parse()
                    .unwrap_or(8086),
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/thumbnails".to_string()),
                replica_url: std::env::var("DATABASE_REPLICA_URL").ok(),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
                base_url: std::env::var("MEDIA_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8086/media".to_string()),
            },
            events: EventsConfig {
                webhook_url: std::env::var("THUMBNAIL_WEBHOOK_URL").ok(),
            },
        })
    }
}
