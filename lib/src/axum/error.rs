use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;

use crate::{Error, ErrorKind};

/// Implements conversion into json response for all possible error variants.
///
/// Client-caused errors map onto 4xx codes, everything else becomes a 500.
/// The body is always `{"detail": "<message>"}`. Backtraces are never part of
/// the response and are only available through the application logs.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self.kind {
            ErrorKind::BadInput(_) => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if self.is_client_error() {
            tracing::debug!("{}", self.kind);
        } else {
            tracing::error!("{}", self);
        }
        (status, Json(json!({ "detail": self.kind.to_string() }))).into_response()
    }
}
