//! HTTP mapping of service errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::Error;

/// Wrapper that turns a library error into an axum rejection.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::UnsupportedMediaType(_) => StatusCode::NOT_ACCEPTABLE,
            Error::Backend { .. } | Error::Auth(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let mut body = json!({
            "type": "about:blank",
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "detail": self.0.to_string(),
        });
        if let Error::BadRequest(findings) = &self.0 {
            let mut invalid: Vec<String> = findings.unknown_keys.clone();
            invalid.extend(findings.invalid_values.iter().map(|iv| iv.key.clone()));
            if !invalid.is_empty() {
                body["invalidKeys"] = json!(invalid);
            }
            if !findings.missing_keys.is_empty() {
                body["missingKeys"] = json!(findings.missing_keys);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}
