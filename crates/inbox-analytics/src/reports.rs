//! Markdown report generation from analytics data and conversation threads.

use crate::aggregations::AnalyticsSummary;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use inbox_core::response::{Button, ButtonTemplate, CarouselElement, ResponseContent};
use inbox_core::types::{ConversationThread, Message, MessageBody};

/// Report generator for analytics summaries and conversation transcripts.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Full analytics report. Receivers with an entry in `receiver_names` are
    /// shown with that display name next to their id.
    pub fn summary_report(
        summary: &AnalyticsSummary,
        receiver_id: Option<&str>,
        receiver_names: &BTreeMap<String, String>,
    ) -> String {
        let mut report = String::new();

        report.push_str("# Conversation Analytics\n\n");
        if let Some(receiver) = receiver_id {
            report.push_str(&format!(
                "**Receiver:** {}\n\n",
                receiver_label(receiver, receiver_names)
            ));
        }

        report.push_str("## Overview\n\n");
        report.push_str(&format!(
            "- **Conversations:** {}\n",
            summary.total_conversations
        ));
        report.push_str(&format!(
            "- **Messages:** {} ({} user, {} assistant)\n",
            summary.total_messages, summary.user_messages, summary.assistant_messages
        ));
        report.push_str(&format!(
            "- **Verification Codes:** {}\n",
            summary.verification_codes
        ));
        report.push_str(&format!(
            "- **Product Carousels:** {}\n\n",
            summary.product_carousels
        ));

        let types = &summary.response_types;
        report.push_str("## Response Types\n\n");
        report.push_str("| Type | Count |\n");
        report.push_str("|------|-------|\n");
        report.push_str(&format!("| DM Text | {} |\n", types.dm_text));
        report.push_str(&format!("| DM Carousel | {} |\n", types.dm_carousel));
        report.push_str(&format!("| Comment Reply | {} |\n", types.comment_reply));
        report.push_str(&format!("| Button Template | {} |\n", types.button_template));
        report.push('\n');

        if !summary.top_senders.is_empty() {
            report.push_str("## Top Senders\n\n");
            for (i, sender) in summary.top_senders.iter().enumerate() {
                report.push_str(&format!(
                    "{}. `{}` - {} messages\n",
                    i + 1,
                    sender.sender_id,
                    sender.count
                ));
            }
            report.push('\n');
        }

        if !summary.top_receivers.is_empty() {
            report.push_str("## Top Receivers\n\n");
            for (i, receiver) in summary.top_receivers.iter().enumerate() {
                report.push_str(&format!(
                    "{}. {} - {} conversations\n",
                    i + 1,
                    receiver_label(&receiver.receiver_id, receiver_names),
                    receiver.count
                ));
            }
            report.push('\n');
        }

        report
    }

    /// Compact one-screen summary for the terminal.
    pub fn text_summary(summary: &AnalyticsSummary) -> String {
        let types = &summary.response_types;
        let mut output = format!(
            "  Conversations: {}  Messages: {} ({} user / {} assistant)\n",
            summary.total_conversations,
            summary.total_messages,
            summary.user_messages,
            summary.assistant_messages
        );
        output.push_str(&format!(
            "  Responses: dm_text {}  dm_carousel {}  comment_reply {}  button_template {}\n",
            types.dm_text, types.dm_carousel, types.comment_reply, types.button_template
        ));
        output.push_str(&format!(
            "  Verification codes: {}  Product carousels: {}\n",
            summary.verification_codes, summary.product_carousels
        ));

        if !summary.top_senders.is_empty() {
            output.push_str("  Top senders:");
            for sender in summary.top_senders.iter().take(5) {
                output.push_str(&format!(" {}({})", sender.sender_id, sender.count));
            }
            output.push('\n');
        }
        output
    }

    /// Markdown transcript of one thread.
    pub fn transcript(thread: &ConversationThread) -> String {
        let mut out = format!(
            "# {} → {}\n\n",
            thread.sender_id, thread.receiver_id
        );
        let count = thread.conversation.len();
        out.push_str(&format!(
            "{} message{}",
            count,
            if count == 1 { "" } else { "s" }
        ));
        if let Some(latest) = thread.latest_timestamp() {
            out.push_str(&format!(", last activity {}", format_timestamp(latest)));
        }
        out.push_str("\n\n");

        for message in &thread.conversation {
            render_message(&mut out, message);
        }
        out
    }
}

fn render_message(out: &mut String, message: &Message) {
    match &message.body {
        MessageBody::User(payload) => {
            out.push_str(&format!("### User · {}\n\n", format_timestamp(message.ts)));
            let text = payload.input_query().unwrap_or("No message");
            for line in text.lines() {
                out.push_str(&format!("> {}\n", line));
            }
            out.push('\n');
        }
        MessageBody::Assistant(_) => {
            out.push_str(&format!("### Assistant · {}\n\n", format_timestamp(message.ts)));
            let parts = DisplayParts::collect(message);
            if parts.is_empty() {
                out.push_str("_Response data (no displayable content)_\n\n");
                return;
            }
            if let (Some(text), None) = (parts.text, parts.button_template) {
                out.push_str(text);
                out.push_str("\n\n");
            }
            if let Some(template) = parts.button_template {
                out.push_str(template.text);
                out.push_str("\n\n");
                for button in template.buttons {
                    out.push_str(&format!("- {}\n", button_link(button)));
                }
                out.push('\n');
            }
            if let Some(elements) = parts.carousel {
                out.push_str("**Fresh Finds**\n\n");
                for element in elements {
                    out.push_str(&format!("- {}\n", carousel_line(element)));
                }
                out.push('\n');
            }
        }
    }
}

/// What an assistant message shows. Later items overwrite earlier ones of the
/// same kind, and a button template hides plain text.
#[derive(Default)]
struct DisplayParts<'a> {
    text: Option<&'a str>,
    button_template: Option<ButtonTemplate<'a>>,
    carousel: Option<&'a [CarouselElement]>,
}

impl<'a> DisplayParts<'a> {
    fn collect(message: &'a Message) -> Self {
        let mut parts = Self::default();
        for item in message.response_items() {
            match item.content() {
                ResponseContent::PlainText(text) | ResponseContent::CommentReply(text) => {
                    parts.text = Some(text)
                }
                ResponseContent::ButtonTemplate(template) => parts.button_template = Some(template),
                ResponseContent::Carousel(elements) if !elements.is_empty() => {
                    parts.carousel = Some(elements)
                }
                ResponseContent::Carousel(_) | ResponseContent::Unknown => {}
            }
        }
        parts
    }

    fn is_empty(&self) -> bool {
        self.text.is_none() && self.button_template.is_none() && self.carousel.is_none()
    }
}

fn receiver_label(receiver_id: &str, names: &BTreeMap<String, String>) -> String {
    match names.get(receiver_id) {
        Some(name) => format!("`{}` ({})", receiver_id, name),
        None => format!("`{}`", receiver_id),
    }
}

fn button_link(button: &Button) -> String {
    let title = button.title.as_deref().unwrap_or("Open");
    match &button.url {
        Some(url) => format!("[{}]({})", title, url),
        None => title.to_string(),
    }
}

fn carousel_line(element: &CarouselElement) -> String {
    let title = element.title.as_deref().unwrap_or("Product");
    match &element.subtitle {
        Some(subtitle) => format!("**{}** - {}", title, subtitle),
        None => format!("**{}**", title),
    }
}

/// `MMM d, h:mm a`, e.g. `May 1, 9:05 AM`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%b %-d, %-I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregations::summarize_records;
    use chrono::TimeZone;
    use inbox_core::build_threads;
    use inbox_core::types::InteractionRecord;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn thread(records: Vec<InteractionRecord>) -> ConversationThread {
        build_threads(&records, None).unwrap().remove(0)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(at(9, 5)), "May 1, 9:05 AM");
        assert_eq!(format_timestamp(at(21, 30)), "May 1, 9:30 PM");
    }

    #[test]
    fn test_transcript_text_and_user_fallback() {
        let t = thread(vec![
            InteractionRecord::new("A", "R1", at(9, 0))
                .with_input_query("hello")
                .with_response(r#"[{"channel":"dm_text","payload":{"message":{"text":"Hi there"}}}]"#),
            InteractionRecord::new("A", "R1", at(9, 1)),
        ]);
        let md = ReportGenerator::transcript(&t);

        assert!(md.starts_with("# A → R1\n\n3 messages, last activity May 1, 9:01 AM"));
        assert!(md.contains("### User · May 1, 9:00 AM\n\n> hello\n"));
        assert!(md.contains("### Assistant · May 1, 9:00 AM\n\nHi there\n"));
        assert!(md.contains("> No message\n"));
    }

    #[test]
    fn test_transcript_button_template_hides_text() {
        let t = thread(vec![InteractionRecord::new("A", "R1", at(10, 0)).with_response(
            r#"[{"channel":"dm_text","payload":{"message":{"text":"hidden"}}},
                {"channel":"dm_text","payload":{"message":{"attachment":{"payload":{"template_type":"button","text":"Shop now","buttons":[{"title":"Open store","url":"https://shop.example"}]}}}}}]"#,
        )]);
        let md = ReportGenerator::transcript(&t);

        assert!(!md.contains("hidden"));
        assert!(md.contains("Shop now\n\n- [Open store](https://shop.example)\n"));
    }

    #[test]
    fn test_transcript_carousel_and_empty_response() {
        let t = thread(vec![
            InteractionRecord::new("A", "R1", at(11, 0)).with_response(
                r#"[{"channel":"dm_carousel","payload":{"message":{"attachment":{"payload":{"elements":[{"title":"Shoe","subtitle":"$40"},{"title":"Hat"}]}}}}}]"#,
            ),
            InteractionRecord::new("A", "R1", at(11, 5)).with_response(r#"[{"channel":"unknown"}]"#),
        ]);
        let md = ReportGenerator::transcript(&t);

        assert!(md.contains("**Fresh Finds**\n\n- **Shoe** - $40\n- **Hat**\n"));
        assert!(md.contains("_Response data (no displayable content)_"));
    }

    #[test]
    fn test_summary_report_sections() {
        let records = vec![
            InteractionRecord::new("A", "R1", at(9, 0))
                .with_input_query("verify me with velvee")
                .with_response(r#"[{"channel":"comment_reply","payload":{"message":"ok"}}]"#),
        ];
        let summary = summarize_records(&records, Some("R1")).unwrap();
        let report = ReportGenerator::summary_report(&summary, Some("R1"), &BTreeMap::new());

        assert!(report.contains("**Receiver:** `R1`"));
        assert!(report.contains("- **Conversations:** 1\n"));
        assert!(report.contains("- **Verification Codes:** 1\n"));
        assert!(report.contains("| Comment Reply | 1 |"));
        assert!(report.contains("1. `A` - 2 messages"));
        assert!(report.contains("1. `R1` - 1 conversations"));
    }

    #[test]
    fn test_summary_report_uses_receiver_names() {
        let records = vec![
            InteractionRecord::new("A", "17841463322932022", at(9, 0)),
            InteractionRecord::new("B", "R2", at(9, 5)),
        ];
        let names = BTreeMap::from([("17841463322932022".to_string(), "anuwaytostyle".to_string())]);
        let summary = summarize_records(&records, None).unwrap();
        let report = ReportGenerator::summary_report(&summary, Some("17841463322932022"), &names);

        assert!(report.contains("**Receiver:** `17841463322932022` (anuwaytostyle)"));
        assert!(report.contains("1. `17841463322932022` (anuwaytostyle) - 1 conversations"));
        assert!(report.contains("2. `R2` - 1 conversations"));
    }

    #[test]
    fn test_summary_report_empty() {
        let summary = summarize_records(&[], None).unwrap();
        let report = ReportGenerator::summary_report(&summary, None, &BTreeMap::new());
        assert!(!report.contains("## Top Senders"));
        assert!(ReportGenerator::text_summary(&summary).contains("Conversations: 0"));
    }
}
