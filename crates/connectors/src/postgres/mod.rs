use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_core::{
    error::StoreError,
    store::{EntityStats, MirrorStore, UpsertOutcome},
};
use model::{
    entity::{EntityKind, EntityProfile},
    page::RecordDraft,
    sync::SyncCheckpoint,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Client;
use tracing::debug;

mod utils;

pub use utils::connect_client;

const RECORD_TABLE_SQL: &str = include_str!("sql/record_table.sql");
const CHECKPOINT_TABLE_SQL: &str = include_str!("sql/checkpoint_table.sql");
const RECORD_UPSERT_SQL: &str = include_str!("sql/record_upsert.sql");
const CHECKPOINT_UPSERT_SQL: &str = include_str!("sql/checkpoint_upsert.sql");
const CHECKPOINT_GET_SQL: &str = include_str!("sql/checkpoint_get.sql");
const ENTITY_STATS_SQL: &str = include_str!("sql/entity_stats.sql");
const DATABASE_SIZE_SQL: &str = include_str!("sql/database_size.sql");

/// PostgreSQL mirror store.
///
/// The page upsert runs in one transaction with newer-wins conflict
/// resolution, so a replayed page can never regress or duplicate rows.
/// Checkpoint advancement is monotonic in SQL (`GREATEST`), not in client
/// logic, which keeps it correct under any call ordering.
#[derive(Clone)]
pub struct PgMirrorStore {
    client: Arc<RwLock<Client>>,
}

impl PgMirrorStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(Self { client })
    }

    /// Smoke test used by `test-conn`.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let client = self.client.read().await;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(StoreError::query)?;
        Ok(())
    }
}

fn render(sql: &str, profile: &EntityProfile) -> String {
    sql.replace("{table}", profile.table)
        .replace("{id_column}", profile.id_column)
}

#[async_trait]
impl MirrorStore for PgMirrorStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let client = self.client.read().await;
        for entity in EntityKind::ALL {
            client
                .batch_execute(&render(RECORD_TABLE_SQL, entity.profile()))
                .await
                .map_err(StoreError::query)?;
        }
        client
            .batch_execute(CHECKPOINT_TABLE_SQL)
            .await
            .map_err(StoreError::query)?;
        Ok(())
    }

    async fn upsert_page(
        &self,
        entity: EntityKind,
        records: &[RecordDraft],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let sql = render(RECORD_UPSERT_SQL, entity.profile());
        let mut client = self.client.write().await;
        let tx = client.transaction().await.map_err(StoreError::query)?;
        let statement = tx.prepare(&sql).await.map_err(StoreError::query)?;

        for record in records {
            let row = tx
                .query_opt(
                    &statement,
                    &[&record.id, &record.payload, &record.last_modified],
                )
                .await
                .map_err(StoreError::query)?;
            match row {
                // The conflict guard filtered the write: stored version is
                // equal or newer.
                None => outcome.unchanged += 1,
                Some(row) => {
                    if row.get::<_, bool>(0) {
                        outcome.inserted += 1;
                    } else {
                        outcome.updated += 1;
                    }
                }
            }
        }

        tx.commit().await.map_err(StoreError::query)?;
        debug!(
            entity = %entity,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "page applied"
        );
        Ok(outcome)
    }

    async fn checkpoint(
        &self,
        entity: EntityKind,
    ) -> Result<Option<SyncCheckpoint>, StoreError> {
        let client = self.client.read().await;
        let row = client
            .query_opt(CHECKPOINT_GET_SQL, &[&entity.as_str()])
            .await
            .map_err(StoreError::query)?;
        Ok(row.map(|row| SyncCheckpoint {
            entity,
            last_synced_through: row.get(0),
            updated_at: row.get(1),
        }))
    }

    async fn advance_checkpoint(
        &self,
        entity: EntityKind,
        through: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let client = self.client.read().await;
        client
            .execute(CHECKPOINT_UPSERT_SQL, &[&entity.as_str(), &through])
            .await
            .map_err(StoreError::query)?;
        Ok(())
    }

    async fn stats(&self, entity: EntityKind) -> Result<EntityStats, StoreError> {
        let client = self.client.read().await;
        let row = client
            .query_one(&render(ENTITY_STATS_SQL, entity.profile()), &[])
            .await
            .map_err(StoreError::query)?;
        let checkpoint = client
            .query_opt(CHECKPOINT_GET_SQL, &[&entity.as_str()])
            .await
            .map_err(StoreError::query)?
            .map(|row| row.get(0));

        Ok(EntityStats {
            entity,
            records: row.get(0),
            earliest: row.get(1),
            latest: row.get(2),
            checkpoint,
        })
    }

    async fn database_size(&self) -> Result<Option<String>, StoreError> {
        let client = self.client.read().await;
        let row = client
            .query_one(DATABASE_SIZE_SQL, &[])
            .await
            .map_err(StoreError::query)?;
        Ok(Some(row.get(0)))
    }
}
