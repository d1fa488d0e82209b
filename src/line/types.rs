use serde::{Deserialize, Serialize};

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_LENGTH: usize = 5000;

/// The delivery envelope. Events are kept undecoded so one bad event cannot fail its siblings.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    pub events: Vec<serde_json::Value>,
}

/// Reads `deliveryContext.isRedelivery` without decoding the whole event.
pub fn is_raw_redelivery(event: &serde_json::Value) -> bool {
    event
        .pointer("/deliveryContext/isRedelivery")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlatformEvent {
    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default)]
        reply_token: Option<String>,
        message: MessageContent,

        #[serde(default)]
        webhook_event_id: Option<String>,

        #[serde(default)]
        delivery_context: Option<DeliveryContext>,
    },

    /// Follow, unfollow, postback, join etc. None of these are answered.
    #[serde(other)]
    Other,
}
impl PlatformEvent {
    pub fn webhook_event_id(&self) -> Option<&str> {
        match self {
            PlatformEvent::Message {
                webhook_event_id, ..
            } => webhook_event_id.as_deref(),
            PlatformEvent::Other => None,
        }
    }

    pub fn is_redelivery(&self) -> bool {
        match self {
            PlatformEvent::Message {
                delivery_context: Some(context),
                ..
            } => context.is_redelivery,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        text: String,
    },

    /// Stickers, images, locations and anything else without text.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// The single reply for an event. Reply tokens are single use, so at most one of
/// these may ever be built and sent per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyCommand {
    pub reply_token: String,
    pub text: String,
}
impl ReplyCommand {
    pub fn new(reply_token: impl Into<String>, text: &str) -> Self {
        let text = if text.chars().count() > MAX_TEXT_LENGTH {
            text.chars().take(MAX_TEXT_LENGTH).collect()
        } else {
            text.to_string()
        };

        Self {
            reply_token: reply_token.into(),
            text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageRequest<'a> {
    pub reply_token: &'a str,
    pub messages: [TextMessage<'a>; 1],
}
impl<'a> From<&'a ReplyCommand> for ReplyMessageRequest<'a> {
    fn from(command: &'a ReplyCommand) -> Self {
        Self {
            reply_token: &command.reply_token,
            messages: [TextMessage {
                kind: "text",
                text: &command.text,
            }],
        }
    }
}
