//! Thread search and filtering for the dashboard list.

use crate::types::{ConversationThread, Message, MessageBody};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Whether `thread` matches a free-text query.
///
/// Case-insensitive substring match against the sender id, user input
/// queries, and every extractable text of assistant responses. A blank query
/// matches everything.
pub fn thread_matches(thread: &ConversationThread, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    thread_matches_normalized(thread, &query)
}

fn thread_matches_normalized(thread: &ConversationThread, query: &str) -> bool {
    contains(&thread.sender_id, query) || thread.conversation.iter().any(|m| message_matches(m, query))
}

fn message_matches(message: &Message, query: &str) -> bool {
    match &message.body {
        MessageBody::User(payload) => payload.input_query().is_some_and(|q| contains(q, query)),
        MessageBody::Assistant(payload) => payload
            .items()
            .iter()
            .any(|item| item.searchable_texts().into_iter().any(|t| contains(t, query))),
    }
}

fn contains(haystack: &str, lowered_query: &str) -> bool {
    haystack.to_lowercase().contains(lowered_query)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadSort {
    /// Sender id ascending (the order threads are built in).
    #[default]
    Sender,
    /// Most recent message first; empty threads last.
    Recent,
}

/// Dashboard list filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadFilter {
    pub receiver_id: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ThreadSort,
}

impl ThreadFilter {
    /// Apply receiver exact-match, then search, then ordering.
    pub fn apply(&self, threads: Vec<ConversationThread>) -> Vec<ConversationThread> {
        let receiver = self.receiver_id.as_deref().filter(|r| !r.is_empty());
        let query = self
            .search
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let mut filtered: Vec<ConversationThread> = threads
            .into_iter()
            .filter(|t| receiver.map_or(true, |r| t.receiver_id == r))
            .filter(|t| query.as_deref().map_or(true, |q| thread_matches_normalized(t, q)))
            .collect();

        if self.sort == ThreadSort::Recent {
            filtered.sort_by_key(|t| Reverse(t.latest_timestamp()));
        }
        filtered
    }
}

/// Distinct receiver ids, sorted.
pub fn distinct_receivers(threads: &[ConversationThread]) -> Vec<String> {
    let mut receivers: Vec<String> = threads.iter().map(|t| t.receiver_id.clone()).collect();
    receivers.sort();
    receivers.dedup();
    receivers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::build_threads;
    use crate::types::InteractionRecord;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn threads() -> Vec<ConversationThread> {
        let records = vec![
            InteractionRecord::new("alice_1", "R1", at(10))
                .with_input_query("Do you ship to Canada?")
                .with_response(r#"[{"channel":"dm_text","payload":{"message":{"text":"We ship worldwide"}}}]"#),
            InteractionRecord::new("bob_2", "R2", at(50))
                .with_input_query("sneakers")
                .with_response(
                    r#"[{"channel":"dm_carousel","payload":{"message":{"attachment":{"payload":{"elements":[{"title":"Trail Runner","subtitle":"Waterproof"}]}}}}}]"#,
                ),
            InteractionRecord::new("carol_3", "R1", at(30))
                .with_input_query("link?")
                .with_response(
                    r#"[{"channel":"dm_text","payload":{"message":{"attachment":{"payload":{"template_type":"button","text":"Tap below to browse","buttons":[]}}}}}]"#,
                ),
            InteractionRecord::new("dave_4", "R3", at(20))
                .with_response(r#"[{"channel":"comment_reply","payload":{"message":"Sent you a DM"}}]"#),
        ];
        build_threads(&records, None).unwrap()
    }

    fn find<'a>(threads: &'a [ConversationThread], sender: &str) -> &'a ConversationThread {
        threads.iter().find(|t| t.sender_id == sender).unwrap()
    }

    #[test]
    fn test_matches_sender_id_case_insensitive() {
        let all = threads();
        assert!(thread_matches(find(&all, "alice_1"), "ALICE"));
        assert!(!thread_matches(find(&all, "bob_2"), "alice"));
    }

    #[test]
    fn test_matches_user_input_and_response_texts() {
        let all = threads();
        assert!(thread_matches(find(&all, "alice_1"), "canada"));
        assert!(thread_matches(find(&all, "alice_1"), "worldwide"));
        assert!(thread_matches(find(&all, "bob_2"), "trail"));
        assert!(thread_matches(find(&all, "bob_2"), "waterproof"));
        assert!(thread_matches(find(&all, "carol_3"), "browse"));
        assert!(thread_matches(find(&all, "dave_4"), "sent you"));
        assert!(!thread_matches(find(&all, "dave_4"), "canada"));
    }

    #[test]
    fn test_blank_query_matches_everything() {
        let all = threads();
        assert!(all.iter().all(|t| thread_matches(t, "   ")));
    }

    #[test]
    fn test_filter_receiver_search_and_recent_sort() {
        let filter = ThreadFilter {
            receiver_id: Some("R1".into()),
            search: None,
            sort: ThreadSort::Recent,
        };
        let senders: Vec<String> = filter
            .apply(threads())
            .into_iter()
            .map(|t| t.sender_id)
            .collect();
        assert_eq!(senders, vec!["carol_3", "alice_1"]);

        let filter = ThreadFilter {
            receiver_id: None,
            search: Some(" DM ".into()),
            sort: ThreadSort::Sender,
        };
        let senders: Vec<String> = filter
            .apply(threads())
            .into_iter()
            .map(|t| t.sender_id)
            .collect();
        assert_eq!(senders, vec!["dave_4"]);
    }

    #[test]
    fn test_distinct_receivers_sorted() {
        assert_eq!(distinct_receivers(&threads()), vec!["R1", "R2", "R3"]);
    }
}
