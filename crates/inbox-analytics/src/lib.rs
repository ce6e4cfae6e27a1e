//! Analytics, aggregation, and reporting over reconstructed conversations.
//!
//! Computes dashboard counters from conversation threads: message totals,
//! response channel counts, verification requests, and sender/receiver
//! rankings, plus markdown reports and transcripts.

pub mod aggregations;
pub mod reports;

pub use aggregations::{summarize, summarize_records, Analytics, AnalyticsSummary};
pub use reports::ReportGenerator;
