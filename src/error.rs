use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::types::FormatTag;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot classify location: {0}")]
    Classification(String),

    #[error("{format} backend failed for track {key}: {source}")]
    Delegation {
        key: String,
        format: FormatTag,
        #[source]
        source: Box<Error>,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl Error {
    /// Wrap a backend error with the track and format it was raised for.
    pub fn delegation(key: &str, format: FormatTag, source: Error) -> Self {
        Error::Delegation {
            key: key.to_string(),
            format,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::UnsupportedFormat(_) => "UnsupportedFormat",
            Error::Classification(_) => "ClassificationFailure",
            Error::Delegation { .. } => "DelegationFailure",
            Error::InvariantViolation(_) => "InvariantViolation",
            Error::PayloadTooLarge => "PayloadTooLarge",
            Error::InvalidInput(_) => "InvalidInput",
            Error::InvalidRange(_) => "InvalidRange",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Error::Classification(_) => StatusCode::BAD_REQUEST,
            Error::Delegation { source, .. } => source.status_code(),
            Error::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::InvalidRange(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (
            self.status_code(),
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            axum::Json(body),
        )
            .into_response()
    }
}
