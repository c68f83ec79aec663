//! PostgreSQL mirror store
//!
//! All kinds share the `cloud_resources` table; payloads are JSONB.

use super::{
    MirrorStore, NewRecord, RecordFilter, RecordUpdate, StoreError, StoreResult, StoredRecord,
};
use async_trait::async_trait;
use shared::util::{new_local_id, now_millis};
use shared::{ResourceKind, Vendor};
use sqlx::{PgPool, Postgres, QueryBuilder};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResourceRow {
    id: String,
    vendor: String,
    kind: String,
    account_id: String,
    region: String,
    cloud_id: String,
    parent_id: Option<String>,
    stamp: Option<String>,
    payload: serde_json::Value,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ResourceRow> for StoredRecord {
    type Error = StoreError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            vendor: row
                .vendor
                .parse::<Vendor>()
                .map_err(|e| StoreError::Database(e.to_string()))?,
            kind: row
                .kind
                .parse::<ResourceKind>()
                .map_err(|e| StoreError::Database(e.to_string()))?,
            id: row.id,
            account_id: row.account_id,
            region: row.region,
            cloud_id: row.cloud_id,
            parent_id: row.parent_id,
            stamp: row.stamp,
            payload: row.payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgMirrorStore {
    pool: PgPool,
}

impl PgMirrorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the bundled migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    qb.push(" WHERE vendor = ")
        .push_bind(filter.vendor.as_str())
        .push(" AND kind = ")
        .push_bind(filter.kind.as_str())
        .push(" AND account_id = ")
        .push_bind(filter.account_id.clone())
        .push(" AND region = ")
        .push_bind(filter.region.clone());
    if let Some(ids) = &filter.cloud_ids {
        qb.push(" AND cloud_id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(ids) = &filter.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(parents) = &filter.parent_ids {
        qb.push(" AND parent_id = ANY(")
            .push_bind(parents.clone())
            .push(")");
    }
}

#[async_trait]
impl MirrorStore for PgMirrorStore {
    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<StoredRecord>> {
        let mut qb = QueryBuilder::new(
            "SELECT id, vendor, kind, account_id, region, cloud_id, parent_id, stamp, payload, \
             created_at, updated_at FROM cloud_resources",
        );
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id");
        if let Some(page) = filter.page {
            qb.push(" LIMIT ")
                .push_bind(page.limit as i64)
                .push(" OFFSET ")
                .push_bind(page.offset as i64);
        }
        let rows: Vec<ResourceRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(StoredRecord::try_from).collect()
    }

    async fn batch_create(&self, records: Vec<NewRecord>) -> StoreResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let kind = records[0].kind;
        let now = now_millis();
        let ids: Vec<String> = records.iter().map(|_| new_local_id()).collect();

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO cloud_resources (id, vendor, kind, account_id, region, cloud_id, \
             parent_id, stamp, payload, created_at, updated_at) ",
        );
        qb.push_values(ids.iter().zip(records), |mut b, (id, r)| {
            b.push_bind(id.clone())
                .push_bind(r.vendor.as_str())
                .push_bind(r.kind.as_str())
                .push_bind(r.account_id)
                .push_bind(r.region)
                .push_bind(r.cloud_id)
                .push_bind(r.parent_id)
                .push_bind(r.stamp)
                .push_bind(r.payload)
                .push_bind(now)
                .push_bind(now);
        });

        let mut tx = self.pool.begin().await?;
        match qb.build().execute(&mut *tx).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::Conflict {
                    kind,
                    cloud_id: db.message().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        for update in updates {
            let result = sqlx::query(
                r#"
                UPDATE cloud_resources
                SET payload = COALESCE($2::jsonb, payload),
                    stamp = COALESCE($3, stamp),
                    updated_at = $4
                WHERE id = $1
                "#,
            )
            .bind(&update.id)
            .bind(&update.payload)
            .bind(&update.stamp)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(update.id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn batch_delete(&self, filter: &RecordFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::new("DELETE FROM cloud_resources");
        push_filter(&mut qb, filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
