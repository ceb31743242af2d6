use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use timetrigger_core::TriggerError;

// ---------------------------------------------------------------------------
// Internal sentinel for malformed request bodies
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain for input
/// that never reached timestamp validation (bad JSON, wrong content type).
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            let body = serde_json::json!({ "error": b.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        let status = match self.0.downcast_ref::<TriggerError>() {
            Some(TriggerError::InvalidTimestamp {
                current, target, ..
            }) => {
                let body = serde_json::json!({
                    "error": self.0.to_string(),
                    "current_seconds": current,
                    "target_seconds": target,
                });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            Some(TriggerError::InvalidConfig(_)) => StatusCode::BAD_REQUEST,
            Some(
                TriggerError::MissedWindow { .. }
                | TriggerError::NoInterface
                | TriggerError::Io(_)
                | TriggerError::Yaml(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
