pub mod types;

use crate::config::{LineConfig, Secrets};
use crate::line::types::{ReplyCommand, ReplyMessageRequest};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::log::debug;

#[derive(thiserror::Error, Debug)]
pub enum ReplyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Reply rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound half of the messaging platform. Replies are best effort and never retried,
/// the reply token is consumed by the first attempt.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn reply(&self, command: &ReplyCommand) -> Result<(), ReplyError>;
}

pub struct LineClient {
    client: Client,
    reply_url: String,
    access_token: String,
}
impl LineClient {
    pub fn new(config: &LineConfig, secrets: &Secrets) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            reply_url: format!(
                "{}/v2/bot/message/reply",
                config.api_base_url.trim_end_matches('/')
            ),
            access_token: secrets.line_access_token.clone(),
        })
    }
}

#[async_trait]
impl ReplyClient for LineClient {
    async fn reply(&self, command: &ReplyCommand) -> Result<(), ReplyError> {
        let response = self
            .client
            .post(&self.reply_url)
            .bearer_auth(&self.access_token)
            .json(&ReplyMessageRequest::from(command))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!("Reply accepted with status {status}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> LineClient {
        let config = LineConfig {
            api_base_url: format!("{}/", server.base_url()),
            ..LineConfig::default()
        };
        let secrets = Secrets {
            line_access_token: "channel-token".to_string(),
            line_channel_secret: "channel-secret".to_string(),
            openai_api_key: None,
            openai_organization: None,
            openai_project: None,
        };
        LineClient::new(&config, &secrets).unwrap()
    }

    #[tokio::test]
    async fn test_reply_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/bot/message/reply")
                .header("authorization", "Bearer channel-token")
                .json_body(json!({
                    "replyToken": "token-1",
                    "messages": [{"type": "text", "text": "hello"}]
                }));
            then.status(200).json_body(json!({}));
        });

        client(&server)
            .reply(&ReplyCommand::new("token-1", "hello"))
            .await
            .unwrap();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_reply_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v2/bot/message/reply");
            then.status(400)
                .json_body(json!({"message": "Invalid reply token"}));
        });

        let result = client(&server)
            .reply(&ReplyCommand::new("used-token", "hello"))
            .await;
        match result {
            Err(ReplyError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid reply token"));
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert_eq!(mock.calls(), 1);
    }
}
