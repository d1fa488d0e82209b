use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A single stateless completion request, built fresh for every event.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_text: String,
    pub model: String,
    pub temperature: Option<f32>,
}
impl GenerationRequest {
    /// Returns None if the user text is blank, the user turn must never be empty.
    pub fn new(
        system_prompt: impl Into<String>,
        user_text: &str,
        model: impl Into<String>,
        temperature: Option<f32>,
    ) -> Option<Self> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return None;
        }

        Some(Self {
            system_prompt: system_prompt.into(),
            user_text: user_text.to_string(),
            model: model.into(),
            temperature,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    AuthFailed,
    Timeout,
    UpstreamError,
    Empty,
}
impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::RateLimited => "rate limited",
            FailureKind::AuthFailed => "authentication failed",
            FailureKind::Timeout => "timed out",
            FailureKind::UpstreamError => "upstream error",
            FailureKind::Empty => "empty completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success {
        text: String,
    },
    Failure {
        kind: FailureKind,
        http_status: Option<u16>,
        detail: String,
    },
}
impl GenerationOutcome {
    pub fn failure(kind: FailureKind, http_status: Option<u16>, detail: impl Into<String>) -> Self {
        GenerationOutcome::Failure {
            kind,
            http_status,
            detail: detail.into(),
        }
    }

    /// Trims the completion content, anything absent or blank becomes `Empty`.
    pub fn from_content(content: Option<&str>) -> Self {
        match content.map(str::trim) {
            Some(text) if !text.is_empty() => GenerationOutcome::Success {
                text: text.to_string(),
            },
            _ => Self::failure(FailureKind::Empty, None, "Completion content was blank"),
        }
    }

    #[cfg(test)]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            GenerationOutcome::Success { .. } => None,
            GenerationOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}
impl<'a> From<&'a GenerationRequest> for ChatCompletionRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}
impl ChatCompletionResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}
