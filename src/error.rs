use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    models::{MessageResponse, StoreReply},
    store::StoreError,
};

/// ApiError
///
/// Every way a request can fail at the API boundary, mapped to a status and a
/// JSON body by `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, detected before any store call.
    #[error("{0}")]
    Validation(String),

    /// The store answered, but not with the expected success message. The reply is
    /// forwarded as-is.
    #[error("record store reported failure: {0:?}")]
    StoreFailure(StoreReply),

    /// Sign-in with a credential the store does not accept.
    #[error("Invalid login, try again.")]
    InvalidLogin,

    /// The store refused or could not be reached.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failures that must surface as a server error regardless of their cause.
    #[error("unexpected failure: {0}")]
    Unexpected(#[source] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(MessageResponse::new(message))).into_response()
            }
            ApiError::StoreFailure(reply) => (StatusCode::BAD_REQUEST, Json(reply)).into_response(),
            ApiError::InvalidLogin => (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new(ApiError::InvalidLogin.to_string())),
            )
                .into_response(),
            ApiError::Store(StoreError::Rejected { message, .. }) => {
                (StatusCode::BAD_REQUEST, Json(MessageResponse::new(message))).into_response()
            }
            ApiError::Store(error) | ApiError::Unexpected(error) => {
                // Log the underlying cause but return a generic internal error.
                tracing::error!(%error, "request failed unexpectedly");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse::new("Internal Server Error")),
                )
                    .into_response()
            }
        }
    }
}
