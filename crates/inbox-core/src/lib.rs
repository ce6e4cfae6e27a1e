pub mod config;
pub mod conversation;
pub mod error;
pub mod response;
pub mod search;
pub mod store;
pub mod trace;
pub mod types;

pub use config::AppConfig;
pub use conversation::build_threads;
pub use error::InboxError;
pub use response::{Channel, ResponseContent, ResponseItem};
pub use search::{thread_matches, ThreadFilter, ThreadSort};
pub use store::{InteractionStore, MemoryStore};
pub use trace::{lookup_trace, TraceDebug};
pub use types::{
    AssistantPayload, ConversationThread, InteractionRecord, Message, MessageBody, Role, UserPayload,
};
