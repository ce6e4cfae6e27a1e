use crate::error::Result;
use crate::types::InteractionRecord;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Read access to the interaction log and the LLM trace tables behind it.
#[async_trait]
pub trait InteractionStore: Send + Sync + 'static {
    /// Every interaction row, optionally restricted to one receiver.
    async fn fetch_interactions(&self, receiver_id: Option<&str>)
        -> Result<Vec<InteractionRecord>>;

    /// Trace id of the first row matching sender and input query exactly.
    async fn find_trace_id(&self, sender_id: &str, input_query: &str) -> Result<Option<String>>;

    /// The `llm_analytics` row for a trace, as a JSON object.
    async fn find_llm_analytics(&self, trace_id: &str) -> Result<Option<Value>>;

    /// All `llm_calls` rows belonging to an analytics record.
    async fn find_llm_calls(&self, analytics_id: &str) -> Result<Vec<Value>>;
}

/// In-process store backed by vectors. Used for tests and fixture-driven runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    interactions: Vec<InteractionRecord>,
    llm_analytics: Vec<Value>,
    llm_calls: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Interactions(Vec<InteractionRecord>),
    Tables {
        interactions: Vec<InteractionRecord>,
        #[serde(default)]
        llm_analytics: Vec<Value>,
        #[serde(default)]
        llm_calls: Vec<Value>,
    },
}

impl MemoryStore {
    pub fn new(interactions: Vec<InteractionRecord>) -> Self {
        Self {
            interactions,
            ..Default::default()
        }
    }

    pub fn with_llm_analytics(mut self, rows: Vec<Value>) -> Self {
        self.llm_analytics = rows;
        self
    }

    pub fn with_llm_calls(mut self, rows: Vec<Value>) -> Self {
        self.llm_calls = rows;
        self
    }

    /// Load a fixture: either a bare array of interaction rows, or an object with
    /// `interactions`, `llm_analytics`, and `llm_calls` arrays.
    pub async fn load_json(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let store = match serde_json::from_str::<Fixture>(&contents)? {
            Fixture::Interactions(interactions) => Self::new(interactions),
            Fixture::Tables {
                interactions,
                llm_analytics,
                llm_calls,
            } => Self::new(interactions)
                .with_llm_analytics(llm_analytics)
                .with_llm_calls(llm_calls),
        };
        tracing::info!(
            "Loaded {} interaction rows from {}",
            store.interactions.len(),
            path.display()
        );
        Ok(store)
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn fetch_interactions(
        &self,
        receiver_id: Option<&str>,
    ) -> Result<Vec<InteractionRecord>> {
        Ok(self
            .interactions
            .iter()
            .filter(|r| receiver_id.map_or(true, |id| r.receiver_id == id))
            .cloned()
            .collect())
    }

    async fn find_trace_id(&self, sender_id: &str, input_query: &str) -> Result<Option<String>> {
        Ok(self
            .interactions
            .iter()
            .find(|r| r.sender_id == sender_id && r.input_query.as_deref() == Some(input_query))
            .and_then(|r| r.columns.get("trace_id"))
            .and_then(key_text))
    }

    async fn find_llm_analytics(&self, trace_id: &str) -> Result<Option<Value>> {
        Ok(self
            .llm_analytics
            .iter()
            .find(|row| row.get("trace_id").and_then(key_text).as_deref() == Some(trace_id))
            .cloned())
    }

    async fn find_llm_calls(&self, analytics_id: &str) -> Result<Vec<Value>> {
        Ok(self
            .llm_calls
            .iter()
            .filter(|row| {
                row.get("analytics_id").and_then(key_text).as_deref() == Some(analytics_id)
            })
            .cloned()
            .collect())
    }
}

/// Text form of a key column, which may be stored as text or as a number.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_filters_by_receiver() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let store = MemoryStore::new(vec![
            InteractionRecord::new("A", "R1", t),
            InteractionRecord::new("B", "R2", t),
        ]);

        assert_eq!(store.fetch_interactions(None).await.unwrap().len(), 2);
        let only = store.fetch_interactions(Some("R2")).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].sender_id, "B");
    }

    #[tokio::test]
    async fn test_load_fixture_with_tables() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fixture.json");
        std::fs::write(
            &path,
            json!({
                "interactions": [{
                    "sender_id": "A",
                    "receiver_id": "R1",
                    "created_at": "2024-05-01T10:00:00Z",
                    "input_query": "hello",
                    "trace_id": 77
                }],
                "llm_analytics": [{"id": 5, "trace_id": "77"}],
                "llm_calls": [{"analytics_id": 5, "model": "m"}, {"analytics_id": 6}]
            })
            .to_string(),
        )
        .unwrap();

        let store = MemoryStore::load_json(&path).await.unwrap();
        assert_eq!(
            store.find_trace_id("A", "hello").await.unwrap().as_deref(),
            Some("77")
        );
        assert!(store.find_llm_analytics("77").await.unwrap().is_some());
        assert_eq!(store.find_llm_calls("5").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_bare_array_fixture() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rows.json");
        std::fs::write(
            &path,
            r#"[{"sender_id":"A","receiver_id":"R1","created_at":"2024-05-01T10:00:00Z"}]"#,
        )
        .unwrap();

        let store = MemoryStore::load_json(&path).await.unwrap();
        assert_eq!(store.fetch_interactions(None).await.unwrap().len(), 1);
    }
}
