use crate::relay::router::{DispatchResult, ReplyRouter};
use futures::future::join_all;
use std::sync::Arc;
use tracing::log::{debug, error};

/// Fans a batch out to one task per event and joins them all. Tasks are not cancelled
/// when a sibling fails, and a panicking task yields `DispatchResult::Aborted`.
///
/// There is no concurrency ceiling, LINE already bounds the number of events per delivery.
#[derive(Clone)]
pub struct EventDispatcher {
    router: Arc<ReplyRouter>,
}
impl EventDispatcher {
    pub fn new(router: Arc<ReplyRouter>) -> Self {
        Self { router }
    }

    /// Returns one result per event, in batch order. Events are decoded inside their own task.
    pub async fn dispatch(&self, events: Vec<serde_json::Value>) -> Vec<DispatchResult> {
        debug!("Dispatching batch of {} event(s)", events.len());

        let handles: Vec<_> = events
            .into_iter()
            .map(|event| {
                let router = Arc::clone(&self.router);
                tokio::spawn(async move { router.handle_raw(event).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(idx, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Event #{idx} task failed: {e}");
                    DispatchResult::Aborted
                }
            })
            .collect()
    }
}
