//! Conversation reconstruction.
//!
//! Every interaction row becomes a user message plus, when a response was
//! stored, an assistant message with the same timestamp. Messages are grouped
//! per (sender, receiver) pair and ordered by timestamp, user before assistant
//! on ties.

use crate::error::Result;
use crate::types::{ConversationThread, InteractionRecord, Message};
use std::collections::BTreeMap;

/// Build one thread per (sender, receiver) pair, ordered by sender then receiver.
///
/// `receiver_id` restricts the input to rows for that receiver (exact match).
/// A row whose stored response does not parse fails the whole build.
pub fn build_threads(
    records: &[InteractionRecord],
    receiver_id: Option<&str>,
) -> Result<Vec<ConversationThread>> {
    let mut groups: BTreeMap<(&str, &str), Vec<Message>> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| receiver_id.map_or(true, |id| r.receiver_id == id))
    {
        let messages = record.to_messages()?;
        groups
            .entry((record.sender_id.as_str(), record.receiver_id.as_str()))
            .or_default()
            .extend(messages);
    }

    let threads: Vec<ConversationThread> = groups
        .into_iter()
        .map(|((sender_id, receiver_id), mut conversation)| {
            // Stable: rows sharing a timestamp keep their input order.
            conversation.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.role().cmp(&b.role())));
            ConversationThread {
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                conversation,
            }
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        threads = threads.len(),
        "Built conversation threads"
    );
    Ok(threads)
}
