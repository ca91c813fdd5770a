use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::error;

use crate::models::ServiceError;
use crate::observability::get_current_trace_id;

/// Map a service error to its HTTP status and JSON body.
///
/// Store failures collapse to a flat 500 so no backend detail reaches the client.
pub fn service_error_to_response(err: ServiceError) -> (StatusCode, Json<Value>) {
    let (status, message) = match &err {
        ServiceError::CartNotFound { .. } | ServiceError::CartItemNotFound { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::Unauthorized { message } => (StatusCode::UNAUTHORIZED, message.clone()),
        ServiceError::Repository { source } => {
            error!(error = %source, "Store failure");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Internal Server Error" })),
            );
        }
    };

    let mut body = json!({
        "message": message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Some(trace_id) = get_current_trace_id() {
        body["trace_id"] = Value::String(trace_id);
    }

    (status, Json(body))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        service_error_to_response(self).into_response()
    }
}
