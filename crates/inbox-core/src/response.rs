//! Assistant response items.
//!
//! Each stored response is an array of `{channel, payload}` objects whose nested
//! shape depends on the delivery channel. Items keep their stored JSON verbatim for
//! the wire and expose a typed view ([`ResponseContent`]) for classification,
//! search, and rendering. Shapes that don't match the expected structure classify
//! as [`ResponseContent::Unknown`] instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    DmText,
    DmCarousel,
    CommentReply,
    Other(String),
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::DmText => "dm_text",
            Channel::DmCarousel => "dm_carousel",
            Channel::CommentReply => "comment_reply",
            Channel::Other(tag) => tag,
        }
    }
}

impl From<&str> for Channel {
    fn from(tag: &str) -> Self {
        match tag {
            "dm_text" => Channel::DmText,
            "dm_carousel" => Channel::DmCarousel,
            "comment_reply" => Channel::CommentReply,
            other => Channel::Other(other.to_string()),
        }
    }
}

/// One element of an assistant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct ResponseItem {
    raw: Value,
    channel: Option<Channel>,
    message: Option<ResponseMessage>,
}

impl From<Value> for ResponseItem {
    fn from(raw: Value) -> Self {
        let channel = raw.get("channel").and_then(Value::as_str).map(Channel::from);
        let message = raw
            .pointer("/payload/message")
            .and_then(|m| ResponseMessage::deserialize(m).ok());
        Self {
            raw,
            channel,
            message,
        }
    }
}

impl From<ResponseItem> for Value {
    fn from(item: ResponseItem) -> Self {
        item.raw
    }
}

impl ResponseItem {
    /// The channel tag, if the item carries one.
    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    /// The stored JSON for this item.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The nested `payload.message`, when it has a recognizable shape.
    pub fn message(&self) -> Option<&ResponseMessage> {
        self.message.as_ref()
    }

    /// Classify this item by channel and nested shape.
    pub fn content(&self) -> ResponseContent<'_> {
        let (Some(channel), Some(message)) = (&self.channel, &self.message) else {
            return ResponseContent::Unknown;
        };

        match (channel, message) {
            (Channel::CommentReply, ResponseMessage::Plain(text)) => {
                ResponseContent::CommentReply(text)
            }
            (Channel::CommentReply, ResponseMessage::Structured(msg)) => msg
                .text
                .as_deref()
                .map_or(ResponseContent::Unknown, ResponseContent::CommentReply),
            (Channel::DmText, ResponseMessage::Plain(text)) => ResponseContent::PlainText(text),
            (Channel::DmText, ResponseMessage::Structured(msg)) => {
                if let Some(template) = msg.button_template() {
                    ResponseContent::ButtonTemplate(template)
                } else {
                    msg.text
                        .as_deref()
                        .map_or(ResponseContent::Unknown, ResponseContent::PlainText)
                }
            }
            (Channel::DmCarousel, ResponseMessage::Structured(msg)) => msg
                .carousel_elements()
                .map_or(ResponseContent::Unknown, ResponseContent::Carousel),
            (Channel::DmCarousel, ResponseMessage::Plain(_)) | (Channel::Other(_), _) => {
                ResponseContent::Unknown
            }
        }
    }

    /// Whether the nested message carries a button-template attachment, regardless of channel.
    pub fn has_button_template(&self) -> bool {
        matches!(&self.message, Some(ResponseMessage::Structured(msg)) if msg.button_template().is_some())
    }

    /// Every piece of human-readable text in the item: a plain string message,
    /// `message.text`, the attachment text, and carousel titles and subtitles.
    pub fn searchable_texts(&self) -> Vec<&str> {
        let mut texts = Vec::new();
        match &self.message {
            Some(ResponseMessage::Plain(text)) => texts.push(text.as_str()),
            Some(ResponseMessage::Structured(msg)) => {
                texts.extend(msg.text.as_deref());
                if let Some(payload) = msg.attachment_payload() {
                    texts.extend(payload.text.as_deref());
                    for element in payload.elements.iter().flatten() {
                        texts.extend(element.title.as_deref());
                        texts.extend(element.subtitle.as_deref());
                    }
                }
            }
            None => {}
        }
        texts
    }
}

/// Typed view of one response item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseContent<'a> {
    PlainText(&'a str),
    ButtonTemplate(ButtonTemplate<'a>),
    Carousel(&'a [CarouselElement]),
    CommentReply(&'a str),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonTemplate<'a> {
    pub text: &'a str,
    pub buttons: &'a [Button],
}

/// `payload.message`: a bare string (comment replies) or a structured DM message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResponseMessage {
    Plain(String),
    Structured(StructuredMessage),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredMessage {
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
}

impl StructuredMessage {
    pub fn attachment_payload(&self) -> Option<&AttachmentPayload> {
        self.attachment.as_ref().and_then(|a| a.payload.as_ref())
    }

    /// A button template is either tagged `template_type: "button"` or carries
    /// text plus a buttons array.
    pub fn button_template(&self) -> Option<ButtonTemplate<'_>> {
        let payload = self.attachment_payload()?;
        let tagged = payload.template_type.as_deref() == Some("button");
        let shaped = payload.text.is_some() && payload.buttons.is_some();
        if !(tagged || shaped) {
            return None;
        }
        Some(ButtonTemplate {
            text: payload.text.as_deref().unwrap_or_default(),
            buttons: payload.buttons.as_deref().unwrap_or_default(),
        })
    }

    pub fn carousel_elements(&self) -> Option<&[CarouselElement]> {
        self.attachment_payload()?.elements.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payload: Option<AttachmentPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttachmentPayload {
    pub template_type: Option<String>,
    pub text: Option<String>,
    pub buttons: Option<Vec<Button>>,
    pub elements: Option<Vec<CarouselElement>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// A product card in a carousel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CarouselElement {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub buttons: Option<Vec<Button>>,
}
