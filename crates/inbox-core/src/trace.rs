//! Debug lookup from a logged interaction down to its LLM call records.

use crate::error::{InboxError, Result};
use crate::store::{key_text, InteractionStore};
use serde::Serialize;
use serde_json::Value;

/// The `llm_analytics` row for an interaction and the `llm_calls` rows under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceDebug {
    pub input: Value,
    pub output: Vec<Value>,
}

/// Resolve sender + input query → trace id → analytics record → call records.
/// Any step that finds nothing ends the chain with a step-specific `NotFound`.
pub async fn lookup_trace(
    store: &dyn InteractionStore,
    sender_id: &str,
    input_query: &str,
) -> Result<TraceDebug> {
    if sender_id.is_empty() || input_query.is_empty() {
        return Err(InboxError::MissingParameter(
            "sender_id and input_query".into(),
        ));
    }

    let trace_id = store
        .find_trace_id(sender_id, input_query)
        .await?
        .ok_or_else(|| {
            InboxError::NotFound("No trace_id found for the given sender_id and input_query".into())
        })?;
    tracing::debug!(%trace_id, "Resolved trace id");

    let input = store
        .find_llm_analytics(&trace_id)
        .await?
        .ok_or_else(|| {
            InboxError::NotFound("No analytics data found for the given trace_id".into())
        })?;

    let analytics_id = input.get("id").and_then(key_text).ok_or_else(|| {
        InboxError::NotFound("Analytics record for the given trace_id has no id".into())
    })?;

    let output = store.find_llm_calls(&analytics_id).await?;
    if output.is_empty() {
        return Err(InboxError::NotFound(
            "No LLM calls found for the given analytics record".into(),
        ));
    }

    Ok(TraceDebug { input, output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::InteractionRecord;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn store() -> MemoryStore {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        MemoryStore::new(vec![
            InteractionRecord::new("A", "R1", t)
                .with_input_query("hello")
                .with_column("trace_id", json!("trace-1")),
            InteractionRecord::new("A", "R1", t)
                .with_input_query("orphan")
                .with_column("trace_id", json!("trace-2")),
            InteractionRecord::new("A", "R1", t).with_input_query("untraced"),
            InteractionRecord::new("A", "R1", t)
                .with_input_query("no calls")
                .with_column("trace_id", json!("trace-3")),
        ])
        .with_llm_analytics(vec![
            json!({"id": 10, "trace_id": "trace-1", "total_request_time_ms": 812}),
            json!({"id": 11, "trace_id": "trace-3"}),
        ])
        .with_llm_calls(vec![
            json!({"id": 1, "analytics_id": 10, "model": "gpt"}),
            json!({"id": 2, "analytics_id": 10, "model": "gpt"}),
        ])
    }

    #[tokio::test]
    async fn test_full_chain() {
        let debug = lookup_trace(&store(), "A", "hello").await.unwrap();
        assert_eq!(debug.input["total_request_time_ms"], 812);
        assert_eq!(debug.output.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_parameters() {
        let err = lookup_trace(&store(), "", "hello").await.unwrap_err();
        assert!(matches!(err, InboxError::MissingParameter(_)));
    }

    #[tokio::test]
    async fn test_each_step_reports_not_found() {
        let s = store();

        let err = lookup_trace(&s, "A", "nope").await.unwrap_err();
        assert!(err.to_string().starts_with("No trace_id"));

        let err = lookup_trace(&s, "A", "untraced").await.unwrap_err();
        assert!(err.to_string().starts_with("No trace_id"));

        let err = lookup_trace(&s, "A", "orphan").await.unwrap_err();
        assert!(err.to_string().starts_with("No analytics data"));

        let err = lookup_trace(&s, "A", "no calls").await.unwrap_err();
        assert!(err.to_string().starts_with("No LLM calls"));
    }
}
