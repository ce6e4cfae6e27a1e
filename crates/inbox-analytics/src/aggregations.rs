//! Usage analytics over conversation threads.
//!
//! One linear pass over the threads accumulates message totals, per-channel
//! response counts, and per-sender/per-receiver tallies; two sort-and-truncate
//! steps then produce the top-10 rankings.

use inbox_core::error::InboxError;
use inbox_core::response::{Channel, ResponseContent, ResponseItem};
use inbox_core::types::{ConversationThread, InteractionRecord, MessageBody};
use inbox_core::build_threads;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// User messages containing this phrase (any case) are verification requests.
pub const VERIFICATION_PHRASE: &str = "verify me with velvee";

/// Length of the sender and receiver rankings.
pub const TOP_N: usize = 10;

/// Aggregate usage statistics, in the dashboard's wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_conversations: u64,
    pub total_messages: u64,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub response_types: ResponseTypeCounts,
    /// Thread count per receiver.
    pub receiver_ids: Tally,
    /// Thread count per sender.
    pub sender_ids: Tally,
    pub verification_codes: u64,
    pub product_carousels: u64,
    /// Senders ranked by total messages across their threads.
    pub top_senders: Vec<SenderCount>,
    /// Receivers ranked by thread count.
    pub top_receivers: Vec<ReceiverCount>,
}

/// Response items counted per channel. `button_template` is a sub-count of `dm_text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseTypeCounts {
    pub dm_text: u64,
    pub dm_carousel: u64,
    pub comment_reply: u64,
    pub button_template: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderCount {
    pub sender_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverCount {
    pub receiver_id: String,
    pub count: u64,
}

/// Counter keyed by id that remembers first-encountered order.
///
/// Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn add(&mut self, key: &str, amount: u64) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += amount,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), amount));
            }
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.index.get(key).map_or(0, |&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest counts first; equal counts keep first-encountered order.
    pub fn top(&self, limit: usize) -> Vec<(String, u64)> {
        let mut sorted = self.entries.clone();
        // Stable sort, so ties stay in insertion order.
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(limit);
        sorted
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Analytics engine accumulating a summary across threads.
#[derive(Debug, Default)]
pub struct Analytics {
    summary: AnalyticsSummary,
    /// Message totals per sender, for the sender ranking.
    sender_messages: Tally,
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one thread into the running counts.
    pub fn process_thread(&mut self, thread: &ConversationThread) {
        let summary = &mut self.summary;
        summary.total_conversations += 1;
        summary.receiver_ids.add(&thread.receiver_id, 1);
        summary.sender_ids.add(&thread.sender_id, 1);
        self.sender_messages
            .add(&thread.sender_id, thread.conversation.len() as u64);

        for msg in &thread.conversation {
            summary.total_messages += 1;
            match &msg.body {
                MessageBody::User(payload) => {
                    summary.user_messages += 1;
                    if payload.input_query().is_some_and(is_verification_request) {
                        summary.verification_codes += 1;
                    }
                }
                MessageBody::Assistant(payload) => {
                    summary.assistant_messages += 1;
                    for item in payload.items() {
                        count_response_item(summary, item);
                    }
                }
            }
        }
    }

    /// Process multiple threads.
    pub fn process_threads(&mut self, threads: &[ConversationThread]) {
        for thread in threads {
            self.process_thread(thread);
        }
    }

    /// Compute the rankings and return the finished summary.
    pub fn finalize(self) -> AnalyticsSummary {
        let mut summary = self.summary;
        summary.top_senders = self
            .sender_messages
            .top(TOP_N)
            .into_iter()
            .map(|(sender_id, count)| SenderCount { sender_id, count })
            .collect();
        summary.top_receivers = summary
            .receiver_ids
            .top(TOP_N)
            .into_iter()
            .map(|(receiver_id, count)| ReceiverCount { receiver_id, count })
            .collect();
        summary
    }
}

fn count_response_item(summary: &mut AnalyticsSummary, item: &ResponseItem) {
    let counts = &mut summary.response_types;
    match item.channel() {
        Some(Channel::DmText) => {
            counts.dm_text += 1;
            if matches!(item.content(), ResponseContent::ButtonTemplate(_)) {
                counts.button_template += 1;
            }
        }
        Some(Channel::DmCarousel) => {
            counts.dm_carousel += 1;
            summary.product_carousels += 1;
        }
        Some(Channel::CommentReply) => counts.comment_reply += 1,
        Some(Channel::Other(_)) | None => {}
    }
}

/// Whether a user input asks for verification.
pub fn is_verification_request(input_query: &str) -> bool {
    input_query.to_lowercase().contains(VERIFICATION_PHRASE)
}

/// Summarize a set of threads.
pub fn summarize(threads: &[ConversationThread]) -> AnalyticsSummary {
    let mut analytics = Analytics::new();
    analytics.process_threads(threads);
    let summary = analytics.finalize();
    tracing::debug!(
        threads = summary.total_conversations,
        messages = summary.total_messages,
        "Computed analytics summary"
    );
    summary
}

/// Build threads from raw rows (optionally for one receiver) and summarize them.
pub fn summarize_records(
    records: &[InteractionRecord],
    receiver_id: Option<&str>,
) -> Result<AnalyticsSummary, InboxError> {
    let threads = build_threads(records, receiver_id)?;
    Ok(summarize(&threads))
}
