//! In-process fakes for the generator and reply client, shared by the relay and HTTP tests.

use crate::generator::types::{FailureKind, GenerationOutcome, GenerationRequest};
use crate::generator::UpstreamGenerator;
use crate::line::types::{MessageContent, PlatformEvent, ReplyCommand};
use crate::line::{ReplyClient, ReplyError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&GenerationRequest) -> GenerationOutcome + Send + Sync>;

pub struct FakeGenerator {
    calls: AtomicUsize,
    delay: Duration,
    responder: Responder,
}
impl FakeGenerator {
    pub fn with<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&GenerationRequest) -> GenerationOutcome + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            responder: Box::new(responder),
        })
    }

    /// Replies with `text` after sleeping for `delay`.
    pub fn delayed(text: &str, delay: Duration) -> Arc<Self> {
        let text = text.to_string();
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            responder: Box::new(move |_| GenerationOutcome::Success { text: text.clone() }),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::with(move |_| GenerationOutcome::Success { text: text.clone() })
    }

    pub fn failing(kind: FailureKind, http_status: Option<u16>) -> Arc<Self> {
        Self::with(move |_| GenerationOutcome::failure(kind, http_status, "fake failure"))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest, _timeout: Duration) -> GenerationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.responder)(request)
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct SpyReplies {
    fail: bool,
    attempts: AtomicUsize,
    sent: Mutex<Vec<ReplyCommand>>,
}
impl SpyReplies {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successfully delivered replies, in completion order.
    pub fn sent(&self) -> Vec<ReplyCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, reply_token: &str) -> Vec<ReplyCommand> {
        self.sent()
            .into_iter()
            .filter(|command| command.reply_token == reply_token)
            .collect()
    }
}

#[async_trait]
impl ReplyClient for SpyReplies {
    async fn reply(&self, command: &ReplyCommand) -> Result<(), ReplyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReplyError::Rejected {
                status: 400,
                body: "Invalid reply token".to_string(),
            });
        }

        self.sent.lock().unwrap().push(command.clone());
        Ok(())
    }
}

pub fn text_event(reply_token: &str, text: &str) -> PlatformEvent {
    PlatformEvent::Message {
        reply_token: Some(reply_token.to_string()),
        message: MessageContent::Text {
            text: text.to_string(),
        },
        webhook_event_id: None,
        delivery_context: None,
    }
}

/// The same text event as LINE delivers it, undecoded.
pub fn raw_text_event(reply_token: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "replyToken": reply_token,
        "source": {"type": "user", "userId": "U1"},
        "message": {"type": "text", "id": "1", "text": text}
    })
}
