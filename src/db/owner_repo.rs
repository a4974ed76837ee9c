/// Owner repository - loads the entity behind an owner reference
///
/// Each kind is looked up in its own table by its own key discipline; the
/// query only reads the kind's designated image column. Dispatch is over the
/// closed `OwnerKind` enum, never over runtime type names.
use crate::db::{DataStore, OwnerDirectory};
use crate::error::Result;
use crate::models::{OwnerHandle, OwnerKey, OwnerRef};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Load an owner and its source-image path, or `None` if it does not exist.
pub async fn find_owner(pool: &PgPool, owner: &OwnerRef) -> Result<Option<OwnerHandle>> {
    // Table and column names come from the closed OwnerKind enum, not from
    // request input, so interpolating them is safe.
    let sql = format!(
        "SELECT {column} AS image_path FROM {table} WHERE id = $1",
        column = owner.kind.image_column(),
        table = owner.kind.table(),
    );

    let row = match owner.key {
        OwnerKey::Id(id) => sqlx::query(&sql).bind(id).fetch_optional(pool).await?,
        OwnerKey::Uuid(uuid) => sqlx::query(&sql).bind(uuid).fetch_optional(pool).await?,
    };

    Ok(row.map(|row| OwnerHandle {
        owner: *owner,
        image_path: row.get::<Option<String>, _>("image_path"),
    }))
}

/// Postgres-backed `OwnerDirectory`, reading from the replica pool.
pub struct PgOwnerDirectory {
    store: DataStore,
}

impl PgOwnerDirectory {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OwnerDirectory for PgOwnerDirectory {
    async fn find(&self, owner: &OwnerRef) -> Result<Option<OwnerHandle>> {
        find_owner(self.store.reader(), owner).await
    }
}
