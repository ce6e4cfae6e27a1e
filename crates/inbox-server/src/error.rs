use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use inbox_core::error::InboxError;
use serde::Serialize;

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// Map a domain error to a response. `context` is the client-facing message
    /// used for unexpected failures, e.g. "Failed to fetch analytics".
    pub fn new(context: &str, err: InboxError) -> Self {
        let (status, error, details) = match err {
            InboxError::DatabaseUnconfigured => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None)
            }
            InboxError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            InboxError::MissingParameter(_) | InboxError::InvalidParameter(_) => {
                (StatusCode::BAD_REQUEST, err.to_string(), None)
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                context.to_string(),
                Some(other.to_string()),
            ),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", error, details.as_deref().unwrap_or("no details"));
        } else {
            tracing::debug!(status = status.as_u16(), "{}", error);
        }

        Self {
            status,
            body: ErrorBody { error, details },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let ctx = "Failed to fetch conversations";
        assert_eq!(
            ApiError::new(ctx, InboxError::DatabaseUnconfigured).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::new(ctx, InboxError::NotFound("gone".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::new(ctx, InboxError::MissingParameter("sender_id".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::new(ctx, InboxError::InvalidParameter("sort".into())).status(),
            StatusCode::BAD_REQUEST
        );

        let err = ApiError::new(ctx, InboxError::Query("connection refused".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error, ctx);
        assert_eq!(err.body.details.as_deref(), Some("Query failed: connection refused"));
    }
}
