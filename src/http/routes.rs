use crate::http::types::{DependenciesConfigured, HealthResponse, HttpError};
use crate::http::HttpState;
use crate::relay::router::DispatchResult;
use crate::signature::SIGNATURE_HEADER;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

/// Takes the body as raw bytes, the signature covers the exact bytes LINE sent.
pub async fn webhook(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<DispatchResult>>, HttpError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let results = state.relay.handle_webhook(&body, signature).await?;
    Ok(Json(results))
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        dependencies_configured: DependenciesConfigured {
            generator: state.relay.generator_configured(),
        },
    })
}
