use crate::config::{GeneratorConfig, RelayConfig};
use crate::generator::types::{FailureKind, GenerationOutcome, GenerationRequest};
use crate::generator::UpstreamGenerator;
use crate::line::types::{MessageContent, PlatformEvent, ReplyCommand};
use crate::line::ReplyClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use tracing::log::{debug, info, warn};

pub const RATE_LIMITED_REPLY: &str =
    "Sorry, the service is busy right now. Please try again in a little while.";
pub const MISCONFIGURED_REPLY: &str =
    "Sorry, the service is misconfigured at the moment. The operator has been notified.";
pub const UNAVAILABLE_REPLY: &str =
    "Sorry, the service is temporarily unavailable. Please try again later.";

/// The user facing text sent in place of a failed generation.
pub fn fallback_text(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::RateLimited => RATE_LIMITED_REPLY,
        FailureKind::AuthFailed => MISCONFIGURED_REPLY,
        FailureKind::Timeout | FailureKind::UpstreamError | FailureKind::Empty => {
            UNAVAILABLE_REPLY
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotTextMessage,
    EmptyText,
    NoReplyToken,
    Malformed,
}

/// Per event bookkeeping for the webhook response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    Skipped {
        reason: SkipReason,
    },
    CommandHandled {
        delivered: bool,
    },
    Replied {
        /// Set when a fallback text was sent instead of a generated one.
        fallback: Option<FailureKind>,
        delivered: bool,
    },

    /// The event task panicked before finishing.
    Aborted,
}

#[derive(Debug, PartialEq)]
pub enum Route<'a> {
    Skip(SkipReason),
    Command { reply_token: &'a str },
    Generate {
        reply_token: &'a str,
        request: GenerationRequest,
    },
}

pub struct ReplyRouter {
    generator: Arc<dyn UpstreamGenerator>,
    replies: Arc<dyn ReplyClient>,
    generator_config: GeneratorConfig,
    relay_config: RelayConfig,
}
impl ReplyRouter {
    pub fn new(
        generator: Arc<dyn UpstreamGenerator>,
        replies: Arc<dyn ReplyClient>,
        generator_config: GeneratorConfig,
        relay_config: RelayConfig,
    ) -> Self {
        Self {
            generator,
            replies,
            generator_config,
            relay_config,
        }
    }

    pub fn generator_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// Decides what to do with an event without performing any I/O.
    pub fn classify<'a>(&self, event: &'a PlatformEvent) -> Route<'a> {
        let (reply_token, text) = match event {
            PlatformEvent::Message {
                reply_token,
                message: MessageContent::Text { text },
                ..
            } => (reply_token, text.trim()),
            _ => return Route::Skip(SkipReason::NotTextMessage),
        };

        if text.is_empty() {
            return Route::Skip(SkipReason::EmptyText);
        }
        let reply_token = match reply_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => return Route::Skip(SkipReason::NoReplyToken),
        };

        if text.eq_ignore_ascii_case(self.relay_config.ping_command.trim()) {
            return Route::Command { reply_token };
        }

        match GenerationRequest::new(
            self.generator_config.system_prompt.as_str(),
            text,
            self.generator_config.model.as_str(),
            self.generator_config.temperature,
        ) {
            Some(request) => Route::Generate {
                reply_token,
                request,
            },
            None => Route::Skip(SkipReason::EmptyText),
        }
    }

    /// Decodes one raw batch entry and handles it. An undecodable event is skipped on its own.
    pub async fn handle_raw(&self, raw: serde_json::Value) -> DispatchResult {
        match serde_json::from_value::<PlatformEvent>(raw) {
            Ok(event) => self.handle(&event).await,
            Err(e) => {
                warn!("Skipping malformed event: {e}");
                DispatchResult::Skipped {
                    reason: SkipReason::Malformed,
                }
            }
        }
    }

    /// Handles one event end to end, sending at most one reply.
    #[instrument(skip_all, fields(
        event_id = event.webhook_event_id().unwrap_or("-"),
        redelivery = event.is_redelivery()
    ))]
    pub async fn handle(&self, event: &PlatformEvent) -> DispatchResult {
        match self.classify(event) {
            Route::Skip(reason) => {
                debug!("Skipping event: {reason:?}");
                DispatchResult::Skipped { reason }
            }
            Route::Command { reply_token } => {
                info!("Answering ping command");
                let command = ReplyCommand::new(reply_token, &self.relay_config.ping_reply);
                DispatchResult::CommandHandled {
                    delivered: self.deliver(&command).await,
                }
            }
            Route::Generate {
                reply_token,
                request,
            } => {
                let outcome = self
                    .generator
                    .generate(&request, self.generator_config.timeout())
                    .await;

                let (text, fallback) = match outcome {
                    GenerationOutcome::Success { text } => (text, None),
                    GenerationOutcome::Failure {
                        kind,
                        http_status,
                        detail,
                    } => {
                        warn!("Generation failed ({kind}, status {http_status:?}): {detail}");
                        (fallback_text(kind).to_string(), Some(kind))
                    }
                };

                let command = ReplyCommand::new(reply_token, &text);
                DispatchResult::Replied {
                    fallback,
                    delivered: self.deliver(&command).await,
                }
            }
        }
    }

    /// Sends the reply once. Failures are logged and reported as undelivered, never retried.
    async fn deliver(&self, command: &ReplyCommand) -> bool {
        match self.replies.reply(command).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to deliver reply: {e}");
                false
            }
        }
    }
}
