//! API error-handling module

use std::fmt;

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::communication::dispatch::DispatchError;

/// An error response
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// The error message
    pub error: String,
}

/// An error raised in the API
#[derive(Debug)]
pub struct ApiError {
    /// The status code
    pub status: StatusCode,

    /// The error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new unsupported media type error
    pub fn new_415(message: &str) -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    /// Create a new unprocessable entity error
    pub fn new_422(message: &str) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Create new internal server error
    pub fn new_500(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Create new gateway timeout error
    pub fn new_504(message: &str) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::new_500(&err.to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidRequest(message) => ApiError::new_422(&message),
            DispatchError::InvalidRecipient(_) => {
                ApiError::new_422("Please provide a valid recipient email address")
            }
            DispatchError::InvalidReplyTo(_) => {
                ApiError::new_422("Please provide a valid reply-to email address")
            }
            DispatchError::UndeliverableAddress => {
                ApiError::new_422("Please provide a valid email address")
            }
            DispatchError::CouldNotSend(_) => ApiError::new_500("Could not send email"),
            DispatchError::Timeout => ApiError::new_504("Sending email timed out"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), &rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::new(rejection.status(), &rejection.body_text())
    }
}
