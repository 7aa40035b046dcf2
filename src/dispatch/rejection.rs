//! Request-time rejections.
//!
//! Every rejection carries a machine-readable kind and a human-readable
//! message, rendered as:
//!
//! ```json
//! {"error": {"kind": "VersionNotSupported", "message": "..."}}
//! ```
//!
//! Messages name the request, never the registered version set.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Error kinds the dispatcher can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectionKind {
    InvalidAcceptHeader,
    RouteNotFound,
    VersionNotSupported,
    VersionSunset,
}

impl RejectionKind {
    pub fn status(self) -> StatusCode {
        match self {
            RejectionKind::InvalidAcceptHeader | RejectionKind::VersionNotSupported => {
                StatusCode::BAD_REQUEST
            }
            RejectionKind::RouteNotFound => StatusCode::NOT_FOUND,
            RejectionKind::VersionSunset => StatusCode::GONE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RejectionKind::InvalidAcceptHeader => "InvalidAcceptHeader",
            RejectionKind::RouteNotFound => "RouteNotFound",
            RejectionKind::VersionNotSupported => "VersionNotSupported",
            RejectionKind::VersionSunset => "VersionSunset",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A well-formed request-time rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    kind: RejectionKind,
    message: &'a str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: &self.message,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
