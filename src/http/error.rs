//! Mapping failures to HTTP responses
//!
//! Every error body has a `message` naming the operation that failed and, for
//! anything other than a plain not-found, an `error` with the detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::actions::ActionError;
use crate::domain::DomainError;

const NOT_FOUND_MESSAGE: &str = "Habit not found";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl ApiError {
    /// Map an action failure for the operation described by `context`
    pub fn from_action(context: &str, err: ActionError) -> Self {
        match err {
            ActionError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: NOT_FOUND_MESSAGE.to_string(),
                error: None,
            },
            ActionError::Domain(e @ DomainError::MalformedDocument(_)) => Self::internal(context, e),
            ActionError::Domain(e) => Self::bad_request(context, e),
            ActionError::Storage(e) => Self::internal(context, e),
        }
    }

    pub fn bad_request(context: &str, detail: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: context.to_string(),
            error: Some(detail.to_string()),
        }
    }

    pub fn internal(context: &str, detail: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: context.to_string(),
            error: Some(detail.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.error.as_deref().unwrap_or_default();
        if self.status.is_server_error() {
            error!("{}: {}", self.message, detail);
        } else if self.status != StatusCode::NOT_FOUND {
            warn!("{}: {}", self.message, detail);
        }

        let body = ErrorBody {
            message: &self.message,
            error: self.error.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}
