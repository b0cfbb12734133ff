use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use flow_sdk::{ErrorKind, FlowError};

/// Failure to start or run the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] FlowError),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// A request failure, rendered as `{"error": kind, "message": text, ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// The request could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Flow(err) => match err.kind() {
                ErrorKind::QuerySyntax | ErrorKind::InvalidRequest | ErrorKind::Validation => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::UnsupportedOperator | ErrorKind::BudgetExceeded => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let kind = match self {
            Self::Flow(err) => err.kind().as_str(),
            Self::BadRequest(_) | Self::PayloadTooLarge(_) => ErrorKind::InvalidRequest.as_str(),
            Self::Internal(_) => ErrorKind::Storage.as_str(),
        };
        let mut body = json!({"error": kind, "message": self.to_string()});
        if let Self::Flow(err) = self {
            let details = match err {
                FlowError::QuerySyntax { position, .. } => json!({"position": position}),
                FlowError::UnsupportedOperator { clause, .. } => json!({"clause": clause}),
                FlowError::Validation { index, violations } => {
                    json!({"index": index, "violations": violations})
                }
                FlowError::BudgetExceeded { budget } => json!({"budget": budget}),
                _ => Value::Null,
            };
            if let (Some(body), Value::Object(details)) = (body.as_object_mut(), details) {
                body.extend(details);
            }
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
