//! PostgreSQL implementation of [`Storage`].
//!
//! Filtering, listener resolution and aggregation live in database functions;
//! this module only binds parameters and decodes rows. Identifiers and
//! timestamps are cast to text in SQL so the gateway stays agnostic of the
//! exact column types.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ListenerRow, ResultRow, Storage, parse_payload};
use crate::db;

/// Raw target row as returned by the query functions.
#[derive(Debug, sqlx::FromRow)]
struct TargetRecord {
    target_id: String,
    target_name: String,
    category_data: Option<String>,
    updated_at: String,
}

impl From<TargetRecord> for ResultRow {
    fn from(record: TargetRecord) -> Self {
        ResultRow::new(
            record.target_id,
            record.target_name,
            record.updated_at,
            parse_payload(record.category_data.as_deref()),
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListenerRecord {
    target_id: String,
    target_name: String,
    category_data: Option<String>,
    updated_at: String,
    category_name: String,
}

impl From<ListenerRecord> for ListenerRow {
    fn from(record: ListenerRecord) -> Self {
        ListenerRow {
            category_name: record.category_name,
            row: ResultRow::new(
                record.target_id,
                record.target_name,
                record.updated_at,
                parse_payload(record.category_data.as_deref()),
            ),
        }
    }
}

/// Storage backed by a shared PostgreSQL pool.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Category functions take the numeric version.
fn numeric_version(version: &str) -> Result<i32, sqlx::Error> {
    version
        .parse()
        .map_err(|e| sqlx::Error::Protocol(format!("invalid version '{version}': {e}")))
}

/// Listener functions take the prefixed version (`v1`).
fn prefixed_version(version: &str) -> String {
    format!("v{version}")
}

#[async_trait]
impl Storage for PgStorage {
    async fn category_targets(
        &self,
        category: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ResultRow>, sqlx::Error> {
        let records = sqlx::query_as::<_, TargetRecord>(
            r#"
            SELECT target_id::text AS target_id,
                   target_name::text AS target_name,
                   category_data::text AS category_data,
                   updated_at::text AS updated_at
            FROM get_category_targets_advanced($1, $2, $3::jsonb)
            "#,
        )
        .bind(category)
        .bind(numeric_version(version)?)
        .bind(filters)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(ResultRow::from).collect())
    }

    async fn category_schema(
        &self,
        category: &str,
        version: &str,
    ) -> Result<Option<JsonValue>, sqlx::Error> {
        let schema = sqlx::query_scalar::<_, Option<String>>(
            "SELECT get_category_schema($1, $2)::text",
        )
        .bind(category)
        .bind(numeric_version(version)?)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        let Some(schema) = schema else {
            return Ok(None);
        };

        serde_json::from_str(&schema)
            .map(Some)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    async fn target(
        &self,
        category: &str,
        target_id: Uuid,
    ) -> Result<Option<ResultRow>, sqlx::Error> {
        let record = sqlx::query_as::<_, TargetRecord>(
            r#"
            SELECT t.target_id::text AS target_id,
                   t.name::text AS target_name,
                   tc.category_data::text AS category_data,
                   tc.updated_at::text AS updated_at
            FROM target_categories tc
            JOIN target t ON tc.target_id = t.target_id
            WHERE t.target_id = $1 AND tc.category_name = $2
            "#,
        )
        .bind(target_id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ResultRow::from))
    }

    async fn listener_rows(
        &self,
        listener_id: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ListenerRow>, sqlx::Error> {
        let records = sqlx::query_as::<_, ListenerRecord>(
            r#"
            SELECT target_id::text AS target_id,
                   target_name::text AS target_name,
                   category_data::text AS category_data,
                   updated_at::text AS updated_at,
                   category_name::text AS category_name
            FROM get_listener_filtered_data($1, $2, $3::jsonb)
            "#,
        )
        .bind(listener_id)
        .bind(prefixed_version(version))
        .bind(filters)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(ListenerRow::from).collect())
    }

    async fn multi_listener(
        &self,
        listener_ids: &[String],
        version: &str,
        filters: Option<&str>,
    ) -> Result<JsonValue, sqlx::Error> {
        // Ids travel as a bound text[]; no array literal is built here.
        let result = sqlx::query_scalar::<_, Option<String>>(
            "SELECT get_multi_listener_data($1, $2, $3::jsonb)::text",
        )
        .bind(listener_ids)
        .bind(prefixed_version(version))
        .bind(filters)
        .fetch_one(&self.pool)
        .await?;

        match result {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
            }
            None => Ok(JsonValue::Object(Default::default())),
        }
    }

    async fn healthy(&self) -> bool {
        db::check_health(&self.pool).await
    }
}
