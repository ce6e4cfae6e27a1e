use crate::error::{InboxError, Result};
use crate::response::ResponseItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One logged webhook interaction, as stored in `instagram_webhook_analytics`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractionRecord {
    pub sender_id: String,
    pub receiver_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub input_query: Option<String>,
    /// Raw stored response text. Parsed lazily so a bad row can be reported by identity.
    #[serde(default, deserialize_with = "raw_json_text")]
    pub response: Option<String>,
    /// Every other stored column (e.g. `trace_id`), carried into the user payload.
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl InteractionRecord {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            created_at,
            input_query: None,
            response: None,
            columns: Map::new(),
        }
    }

    pub fn with_input_query(mut self, query: impl Into<String>) -> Self {
        self.input_query = Some(query.into());
        self
    }

    pub fn with_response(mut self, raw: impl Into<String>) -> Self {
        self.response = Some(raw.into());
        self
    }

    pub fn with_column(mut self, key: impl Into<String>, value: Value) -> Self {
        self.columns.insert(key.into(), value);
        self
    }

    /// The row minus its response column. Typed identity fields are filled in
    /// when the stored column map does not already carry them.
    pub fn user_payload(&self) -> UserPayload {
        let mut map = self.columns.clone();
        map.remove("response");
        map.entry("sender_id")
            .or_insert_with(|| Value::String(self.sender_id.clone()));
        map.entry("receiver_id")
            .or_insert_with(|| Value::String(self.receiver_id.clone()));
        map.entry("created_at")
            .or_insert_with(|| Value::String(self.created_at.to_rfc3339()));
        map.entry("input_query").or_insert_with(|| {
            self.input_query
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null)
        });
        UserPayload(map)
    }

    /// Parse the stored response. `None` when the column is null; only text that
    /// is not JSON at all is an error.
    pub fn parse_response(&self) -> Result<Option<AssistantPayload>> {
        let Some(raw) = &self.response else {
            return Ok(None);
        };

        let value: Value =
            serde_json::from_str(raw).map_err(|e| self.malformed(e.to_string()))?;
        Ok(Some(AssistantPayload::from(value)))
    }

    /// The user message and, when a response was stored, its paired assistant message.
    pub fn to_messages(&self) -> Result<Vec<Message>> {
        let mut messages = vec![Message::user(self.created_at, self.user_payload())];
        if let Some(payload) = self.parse_response()? {
            messages.push(Message::assistant(self.created_at, payload));
        }
        Ok(messages)
    }

    fn malformed(&self, reason: String) -> InboxError {
        InboxError::MalformedResponse {
            sender_id: self.sender_id.clone(),
            created_at: self.created_at,
            reason,
        }
    }
}

/// Accept the response column either as stored text or as inline JSON.
fn raw_json_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// Message author. Declaration order is the tie-break order for equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A derived message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "payload", rename_all = "lowercase")]
pub enum MessageBody {
    User(UserPayload),
    Assistant(AssistantPayload),
}

/// Parsed response column. Anything other than an array is kept verbatim and
/// yields no response items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantPayload {
    Items(Vec<ResponseItem>),
    Other(Value),
}

impl AssistantPayload {
    pub fn items(&self) -> &[ResponseItem] {
        match self {
            AssistantPayload::Items(items) => items,
            AssistantPayload::Other(_) => &[],
        }
    }
}

impl From<Value> for AssistantPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                AssistantPayload::Items(items.into_iter().map(ResponseItem::from).collect())
            }
            other => AssistantPayload::Other(other),
        }
    }
}

impl From<Vec<ResponseItem>> for AssistantPayload {
    fn from(items: Vec<ResponseItem>) -> Self {
        AssistantPayload::Items(items)
    }
}

impl Message {
    pub fn user(ts: DateTime<Utc>, payload: UserPayload) -> Self {
        Self {
            ts,
            body: MessageBody::User(payload),
        }
    }

    pub fn assistant(ts: DateTime<Utc>, payload: impl Into<AssistantPayload>) -> Self {
        Self {
            ts,
            body: MessageBody::Assistant(payload.into()),
        }
    }

    pub fn role(&self) -> Role {
        match self.body {
            MessageBody::User(_) => Role::User,
            MessageBody::Assistant(_) => Role::Assistant,
        }
    }

    /// The inbound text, for user messages.
    pub fn input_query(&self) -> Option<&str> {
        match &self.body {
            MessageBody::User(payload) => payload.input_query(),
            MessageBody::Assistant(_) => None,
        }
    }

    /// Response items, for assistant messages. Empty for user messages.
    pub fn response_items(&self) -> &[ResponseItem] {
        match &self.body {
            MessageBody::Assistant(payload) => payload.items(),
            MessageBody::User(_) => &[],
        }
    }
}

/// Stored row columns of an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserPayload(pub Map<String, Value>);

impl UserPayload {
    pub fn input_query(&self) -> Option<&str> {
        self.0.get("input_query").and_then(Value::as_str)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

/// Full ordered message history between one sender and one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub sender_id: String,
    pub receiver_id: String,
    pub conversation: Vec<Message>,
}

impl ConversationThread {
    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    /// Timestamp of the most recent message.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.conversation.iter().map(|m| m.ts).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_user_payload_excludes_response() {
        let record = InteractionRecord::new("A", "R1", at(0))
            .with_input_query("hello")
            .with_response("[]")
            .with_column("trace_id", Value::String("t-1".into()))
            .with_column("response", Value::String("[]".into()));

        let payload = record.user_payload();
        assert!(payload.get("response").is_none());
        assert_eq!(payload.input_query(), Some("hello"));
        assert_eq!(payload.get("trace_id"), Some(&Value::String("t-1".into())));
        assert_eq!(payload.get("sender_id"), Some(&Value::String("A".into())));
    }

    #[test]
    fn test_stored_columns_win_over_typed_fields() {
        let record = InteractionRecord::new("A", "R1", at(0))
            .with_column("created_at", Value::String("2023-11-14 22:13:20+00".into()));
        let payload = record.user_payload();
        assert_eq!(
            payload.get("created_at"),
            Some(&Value::String("2023-11-14 22:13:20+00".into()))
        );
        assert_eq!(payload.get("input_query"), Some(&Value::Null));
    }

    #[test]
    fn test_null_response_yields_single_message() {
        let record = InteractionRecord::new("A", "R1", at(0)).with_input_query("hello");
        let messages = record.to_messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role(), Role::User);
    }

    #[test]
    fn test_invalid_response_is_row_error() {
        let record = InteractionRecord::new("A", "R1", at(5)).with_response("{not json");
        match record.to_messages() {
            Err(InboxError::MalformedResponse { sender_id, created_at, .. }) => {
                assert_eq!(sender_id, "A");
                assert_eq!(created_at, at(5));
            }
            other => panic!("expected malformed response, got {:?}", other),
        }
    }

    #[test]
    fn test_non_array_response_is_kept_verbatim() {
        for raw in ["null", r#"{"channel":"dm_text"}"#, "\"sent\""] {
            let record = InteractionRecord::new("A", "R1", at(0)).with_response(raw);
            let messages = record.to_messages().unwrap();
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[1].role(), Role::Assistant);
            assert!(messages[1].response_items().is_empty());

            let json = serde_json::to_value(&messages[1]).unwrap();
            let stored: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(json["payload"], stored);
        }
    }

    #[test]
    fn test_message_wire_shape() {
        let record = InteractionRecord::new("A", "R1", at(0))
            .with_input_query("hi")
            .with_response(r#"[{"channel":"dm_text","payload":{"message":{"text":"yo"}}}]"#);
        let messages = record.to_messages().unwrap();
        let json = serde_json::to_value(&messages).unwrap();

        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["payload"]["input_query"], "hi");
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["payload"][0]["payload"]["message"]["text"], "yo");
        assert!(json[1]["ts"].is_string());
    }

    #[test]
    fn test_record_deserializes_text_or_inline_response() {
        let text: InteractionRecord = serde_json::from_value(serde_json::json!({
            "sender_id": "A",
            "receiver_id": "R1",
            "created_at": "2024-05-01T10:00:00Z",
            "response": "[]",
            "trace_id": "t-9"
        }))
        .unwrap();
        assert_eq!(text.response.as_deref(), Some("[]"));
        assert_eq!(text.columns.get("trace_id"), Some(&Value::String("t-9".into())));

        let inline: InteractionRecord = serde_json::from_value(serde_json::json!({
            "sender_id": "A",
            "receiver_id": "R1",
            "created_at": "2024-05-01T10:00:00Z",
            "response": [{"channel": "comment_reply", "payload": {"message": "thanks"}}]
        }))
        .unwrap();
        assert_eq!(inline.parse_response().unwrap().unwrap().items().len(), 1);
    }
}
