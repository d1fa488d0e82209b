mod routes;
mod types;

use crate::http::routes::*;
use crate::relay::RelayService;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

#[cfg(feature = "sentry")]
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};

#[cfg(feature = "sentry")]
use tower::ServiceBuilder;

#[cfg(feature = "sentry")]
use tracing::log::debug;

#[derive(Clone)]
pub struct HttpState {
    pub relay: Arc<RelayService>,
}

pub fn create_app(relay: Arc<RelayService>, _sentry: bool) -> axum::Router {
    #[allow(unused_mut)]
    let mut router = axum::Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-version"),
            HeaderValue::from_static(crate::VERSION),
        ));

    // If Sentry is enabled, include axum integration layers.
    #[cfg(feature = "sentry")]
    if _sentry {
        debug!("Adding Sentry HTTP layer!");
        router = router
            .layer(
                ServiceBuilder::new()
                    .layer(NewSentryLayer::<axum::http::Request<axum::body::Body>>::new_from_top()),
            )
            .layer(ServiceBuilder::new().layer(SentryHttpLayer::new().enable_transaction()))
    }

    router.with_state(HttpState { relay })
}
