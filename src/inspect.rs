use anyhow::Result;
use inbox_analytics::reports::format_timestamp;
use inbox_analytics::{summarize, ReportGenerator};
use inbox_core::config::AppConfig;
use inbox_core::store::InteractionStore;
use inbox_core::types::ConversationThread;
use inbox_core::{build_threads, lookup_trace, ThreadFilter, ThreadSort};

async fn load_threads(
    store: &dyn InteractionStore,
    receiver_id: Option<&str>,
) -> Result<Vec<ConversationThread>> {
    let records = store.fetch_interactions(receiver_id).await?;
    Ok(build_threads(&records, receiver_id)?)
}

/// `threads` subcommand: one line per thread, or the dashboard JSON.
pub async fn threads(
    store: &dyn InteractionStore,
    receiver_id: Option<String>,
    query: Option<String>,
    recent: bool,
    json: bool,
) -> Result<()> {
    let filter = ThreadFilter {
        receiver_id,
        search: query,
        sort: if recent {
            ThreadSort::Recent
        } else {
            ThreadSort::Sender
        },
    };
    let threads = filter.apply(load_threads(store, filter.receiver_id.as_deref()).await?);

    if json {
        println!("{}", serde_json::to_string_pretty(&threads)?);
        return Ok(());
    }

    if threads.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }
    for thread in &threads {
        println!("{}", thread_line(thread));
    }
    println!("\n{} conversation(s)", threads.len());
    Ok(())
}

/// `report` subcommand.
pub async fn report(
    store: &dyn InteractionStore,
    config: &AppConfig,
    receiver_id: Option<&str>,
    markdown: bool,
    json: bool,
) -> Result<()> {
    let summary = summarize(&load_threads(store, receiver_id).await?);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if markdown {
        print!("{}", ReportGenerator::summary_report(&summary, receiver_id, &config.receivers));
    } else {
        print!("{}", ReportGenerator::text_summary(&summary));
    }
    Ok(())
}

/// `transcript` subcommand: every thread of one sender, optionally one receiver.
pub async fn transcript(
    store: &dyn InteractionStore,
    sender_id: &str,
    receiver_id: Option<&str>,
) -> Result<()> {
    let threads: Vec<ConversationThread> = load_threads(store, receiver_id)
        .await?
        .into_iter()
        .filter(|t| t.sender_id == sender_id)
        .collect();

    if threads.is_empty() {
        anyhow::bail!("No conversations found for sender {}", sender_id);
    }
    for thread in &threads {
        println!("{}", ReportGenerator::transcript(thread));
    }
    Ok(())
}

/// `trace` subcommand: the debug chain as JSON.
pub async fn trace(store: &dyn InteractionStore, sender_id: &str, input_query: &str) -> Result<()> {
    let debug = lookup_trace(store, sender_id, input_query).await?;
    println!("{}", serde_json::to_string_pretty(&debug)?);
    Ok(())
}

fn thread_line(thread: &ConversationThread) -> String {
    let latest = thread
        .latest_timestamp()
        .map(format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<24} {:<24} {:>4} msgs  {}",
        thread.sender_id,
        thread.receiver_id,
        thread.len(),
        latest
    )
}
