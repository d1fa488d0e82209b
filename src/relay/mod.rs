pub mod dispatcher;
pub mod router;

#[cfg(test)]
pub mod testing;

use crate::config::{GeneratorConfig, RelayConfig};
use crate::generator::UpstreamGenerator;
use crate::line::types::{is_raw_redelivery, WebhookBody};
use crate::line::ReplyClient;
use crate::relay::dispatcher::EventDispatcher;
use crate::relay::router::{DispatchResult, ReplyRouter};
use crate::signature;
use std::sync::Arc;
use tracing::log::{debug, error, info, warn};

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("Missing or invalid webhook signature")]
    SignatureInvalid,
    #[error("Malformed event batch: {0}")]
    BatchMalformed(#[from] serde_json::Error),
}

/// Webhook entry point: verify, parse, dispatch.
pub struct RelayService {
    channel_secret: String,
    dispatcher: EventDispatcher,
    generator_configured: bool,
}
impl RelayService {
    pub fn new(
        channel_secret: String,
        generator: Arc<dyn UpstreamGenerator>,
        replies: Arc<dyn ReplyClient>,
        generator_config: GeneratorConfig,
        relay_config: RelayConfig,
    ) -> Self {
        let router = ReplyRouter::new(generator, replies, generator_config, relay_config);
        Self {
            channel_secret,
            generator_configured: router.generator_configured(),
            dispatcher: EventDispatcher::new(Arc::new(router)),
        }
    }

    pub fn generator_configured(&self) -> bool {
        self.generator_configured
    }

    /// The body is only parsed once its signature has been verified against the raw bytes.
    /// Only an unreadable envelope fails the request. Individual event failures, including
    /// events that do not decode, are reported in the results.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<Vec<DispatchResult>, RelayError> {
        if !signature::verify(body, signature_header, &self.channel_secret) {
            warn!("Rejecting webhook delivery with missing or invalid signature");
            return Err(RelayError::SignatureInvalid);
        }

        let batch: WebhookBody = serde_json::from_slice(body).map_err(|e| {
            error!("Failed to parse signed webhook delivery: {e}");
            RelayError::BatchMalformed(e)
        })?;
        debug!(
            "Webhook delivery for {} with {} event(s)",
            batch.destination.as_deref().unwrap_or("unknown destination"),
            batch.events.len()
        );
        if batch.events.is_empty() {
            info!("Received webhook delivery without events (endpoint verification)");
            return Ok(Vec::new());
        }

        let redeliveries = batch.events.iter().filter(|e| is_raw_redelivery(e)).count();
        if redeliveries > 0 {
            info!("Batch contains {redeliveries} redelivered event(s)");
        }

        let results = self.dispatcher.dispatch(batch.events).await;
        debug!("Webhook batch results: {results:?}");
        Ok(results)
    }
}
