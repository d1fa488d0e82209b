use crate::relay::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}
impl From<RelayError> for HttpError {
    fn from(error: RelayError) -> Self {
        // Parser detail stays in the log, never in the response.
        let (status, message) = match error {
            RelayError::SignatureInvalid => (StatusCode::BAD_REQUEST, error.to_string()),
            RelayError::BatchMalformed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Malformed event batch".to_string(),
            ),
        };
        Self { status, message }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub dependencies_configured: DependenciesConfigured,
}

#[derive(Debug, Serialize)]
pub struct DependenciesConfigured {
    pub generator: bool,
}
