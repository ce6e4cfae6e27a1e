use crate::query_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inbox_core::error::Result;
use inbox_core::store::InteractionStore;
use inbox_core::types::InteractionRecord;
use serde_json::{Map, Value};
use sqlx::{FromRow, Pool, Postgres};

/// Identity columns are cast to text and the timestamp to timestamptz so the
/// row decodes whatever the underlying column types are. `columns` carries the
/// whole row minus `response` for the user payload.
const FETCH_INTERACTIONS: &str = r#"
    SELECT
        i.sender_id::text AS sender_id,
        i.receiver_id::text AS receiver_id,
        i.created_at::timestamptz AS created_at,
        i.input_query::text AS input_query,
        i.response::text AS response,
        to_jsonb(i) - 'response' AS columns
    FROM instagram_webhook_analytics i
    WHERE $1::text IS NULL OR i.receiver_id::text = $1
    ORDER BY i.sender_id, i.created_at
"#;

const FIND_TRACE_ID: &str = r#"
    SELECT trace_id::text
    FROM instagram_webhook_analytics
    WHERE sender_id::text = $1 AND input_query = $2
    LIMIT 1
"#;

const FIND_LLM_ANALYTICS: &str = r#"
    SELECT to_jsonb(a)
    FROM llm_analytics a
    WHERE a.trace_id::text = $1
    LIMIT 1
"#;

const FIND_LLM_CALLS: &str = r#"
    SELECT to_jsonb(c)
    FROM llm_calls c
    WHERE c.analytics_id::text = $1
"#;

#[derive(Debug, FromRow)]
struct InteractionRow {
    sender_id: String,
    receiver_id: String,
    created_at: DateTime<Utc>,
    input_query: Option<String>,
    response: Option<String>,
    columns: Value,
}

impl From<InteractionRow> for InteractionRecord {
    fn from(row: InteractionRow) -> Self {
        let columns = match row.columns {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        InteractionRecord {
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            created_at: row.created_at,
            input_query: row.input_query,
            response: row.response,
            columns,
        }
    }
}

/// Postgres-backed interaction store.
#[derive(Clone)]
pub struct PostgresInteractionRepository {
    pool: Pool<Postgres>,
}

impl PostgresInteractionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PostgresInteractionRepository {
    async fn fetch_interactions(
        &self,
        receiver_id: Option<&str>,
    ) -> Result<Vec<InteractionRecord>> {
        let rows: Vec<InteractionRow> = sqlx::query_as(FETCH_INTERACTIONS)
            .bind(receiver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        tracing::debug!(rows = rows.len(), ?receiver_id, "Fetched interaction rows");
        Ok(rows.into_iter().map(InteractionRecord::from).collect())
    }

    async fn find_trace_id(&self, sender_id: &str, input_query: &str) -> Result<Option<String>> {
        let trace_id: Option<Option<String>> = sqlx::query_scalar(FIND_TRACE_ID)
            .bind(sender_id)
            .bind(input_query)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(trace_id.flatten())
    }

    async fn find_llm_analytics(&self, trace_id: &str) -> Result<Option<Value>> {
        sqlx::query_scalar(FIND_LLM_ANALYTICS)
            .bind(trace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn find_llm_calls(&self, analytics_id: &str) -> Result<Vec<Value>> {
        sqlx::query_scalar(FIND_LLM_CALLS)
            .bind(analytics_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)
    }
}
