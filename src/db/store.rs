/// Database connection handles with an explicit read/write split
///
/// Lookups on the resolve hot path are served from a replica pool; the
/// single write (derivative creation) goes to the primary. The split is
/// carried as a value, never as ambient state.
use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

#[derive(Clone)]
pub struct DataStore {
    primary: PgPool,
    replica: PgPool,
}

impl DataStore {
    /// Connect both pools. Without a configured replica URL the replica
    /// handle aliases the primary pool.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let primary = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to primary: {e}")))?;

        let replica = match &config.replica_url {
            Some(url) => PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to connect to replica: {e}"))
                })?,
            None => primary.clone(),
        };

        info!(
            replica = config.replica_url.is_some(),
            "Database pools connected"
        );

        Ok(Self { primary, replica })
    }

    pub fn from_pools(primary: PgPool, replica: PgPool) -> Self {
        Self { primary, replica }
    }

    /// Pool for read-only lookups.
    pub fn reader(&self) -> &PgPool {
        &self.replica
    }

    /// Pool for writes; must not be used on replica-bound paths.
    pub fn writer(&self) -> &PgPool {
        &self.primary
    }
}
