//! PostgreSQL store.
//!
//! One table, `regulatory_updates`, with a `UNIQUE (authority, source_id)`
//! constraint; the merge rule lives in a single `INSERT ... ON CONFLICT`
//! statement so concurrent writers to the same key serialize at the row.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use vigil_common::{Result, VigilError};

use crate::schema::{ActionType, Authority, QualitySlice, RegulatoryUpdate, UpsertOutcome};
use crate::store::UpdateStore;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with a bounded pool. Fails fast when the database is
    /// unreachable — callers treat that as fatal, before any adapter runs.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the table and its natural-key constraint if absent.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS regulatory_updates (
                id                  UUID PRIMARY KEY,
                authority           TEXT NOT NULL,
                source_id           TEXT NOT NULL,
                title               TEXT NOT NULL,
                category            TEXT NOT NULL,
                jurisdiction        TEXT NOT NULL,
                published_date      DATE,
                captured_at         TIMESTAMPTZ NOT NULL,
                source_url          TEXT NOT NULL DEFAULT '',
                description         TEXT,
                content             TEXT,
                authority_verified  BOOLEAN NOT NULL DEFAULT FALSE,
                cost_data_available BOOLEAN NOT NULL DEFAULT FALSE,
                action_type         TEXT NOT NULL,
                UNIQUE (authority, source_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_update(row: &PgRow) -> Result<RegulatoryUpdate> {
    let authority: String = row.try_get("authority")?;
    let action_type: String = row.try_get("action_type")?;
    Ok(RegulatoryUpdate {
        id: row.try_get("id")?,
        authority: Authority::parse(&authority).ok_or_else(|| {
            VigilError::Validation(format!("unknown authority in store: {authority}"))
        })?,
        source_id: row.try_get("source_id")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        jurisdiction: row.try_get("jurisdiction")?,
        published_date: row.try_get("published_date")?,
        captured_at: row.try_get("captured_at")?,
        source_url: row.try_get("source_url")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        authority_verified: row.try_get("authority_verified")?,
        cost_data_available: row.try_get("cost_data_available")?,
        action_type: ActionType::parse(&action_type).unwrap_or(ActionType::Monitoring),
    })
}

#[async_trait]
impl UpdateStore for PgStore {
    async fn upsert(&self, update: &RegulatoryUpdate) -> Result<UpsertOutcome> {
        // (xmax = 0) distinguishes a fresh insert from a conflict update.
        // captured_at and id are absent from the SET list, so the values
        // written at first insert are immutable from then on.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO regulatory_updates
                (id, authority, source_id, title, category, jurisdiction,
                 published_date, captured_at, source_url, description, content,
                 authority_verified, cost_data_available, action_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (authority, source_id) DO UPDATE SET
                title               = EXCLUDED.title,
                category            = EXCLUDED.category,
                jurisdiction        = EXCLUDED.jurisdiction,
                published_date      = EXCLUDED.published_date,
                source_url          = EXCLUDED.source_url,
                description         = EXCLUDED.description,
                content             = CASE
                    WHEN COALESCE(regulatory_updates.content, '') <> ''
                        THEN regulatory_updates.content
                    ELSE EXCLUDED.content
                END,
                authority_verified  = CASE
                    WHEN COALESCE(regulatory_updates.content, '') <> ''
                        THEN regulatory_updates.authority_verified
                    ELSE EXCLUDED.authority_verified
                END,
                cost_data_available = EXCLUDED.cost_data_available,
                action_type         = EXCLUDED.action_type
            RETURNING (xmax = 0)
            "#,
        )
        .bind(update.id)
        .bind(update.authority.as_str())
        .bind(&update.source_id)
        .bind(&update.title)
        .bind(&update.category)
        .bind(&update.jurisdiction)
        .bind(update.published_date)
        .bind(update.captured_at)
        .bind(&update.source_url)
        .bind(&update.description)
        .bind(&update.content)
        .bind(update.authority_verified)
        .bind(update.cost_data_available)
        .bind(update.action_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            authority = update.authority.as_str(),
            source_id = %update.source_id,
            inserted,
            "upsert applied"
        );

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn pending_enrichment(&self, limit: i64) -> Result<Vec<RegulatoryUpdate>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM regulatory_updates
            WHERE COALESCE(content, '') = '' AND source_url <> ''
            ORDER BY captured_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_update).collect()
    }

    async fn quality_slices(&self) -> Result<Vec<QualitySlice>> {
        let rows = sqlx::query(
            r#"
            SELECT category, jurisdiction,
                   COUNT(*)                                                AS total,
                   COUNT(*) FILTER (WHERE authority_verified)              AS verified,
                   COUNT(*) FILTER (WHERE COALESCE(content, '') <> '')     AS with_content,
                   COUNT(*) FILTER (WHERE COALESCE(description, '') <> '') AS with_description,
                   COUNT(*) FILTER (WHERE cost_data_available)             AS cost_data,
                   COUNT(*) FILTER (WHERE action_type = 'immediate')       AS immediate
            FROM regulatory_updates
            GROUP BY category, jurisdiction
            ORDER BY category, jurisdiction
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QualitySlice {
                    category: row.try_get("category")?,
                    jurisdiction: row.try_get("jurisdiction")?,
                    total: row.try_get("total")?,
                    verified: row.try_get("verified")?,
                    with_content: row.try_get("with_content")?,
                    with_description: row.try_get("with_description")?,
                    cost_data: row.try_get("cost_data")?,
                    immediate: row.try_get("immediate")?,
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM regulatory_updates")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find(
        &self,
        authority: Authority,
        source_id: &str,
    ) -> Result<Option<RegulatoryUpdate>> {
        let row = sqlx::query(
            "SELECT * FROM regulatory_updates WHERE authority = $1 AND source_id = $2",
        )
        .bind(authority.as_str())
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_update).transpose()
    }
}
