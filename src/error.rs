//! Gate error taxonomy and the default error responder.
//!
//! Responsibility:
//! - one terminal error type for everything the gate can reject a request with
//! - the overridable [`ErrorHandler`] strategy
//! - default mapping to an HTTP 401 with a JSON error body

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything the gate can reject a request with.
///
/// Produced by the extractor or the validator, surfaced exactly once to the
/// configured [`ErrorHandler`]. The gate never retries and never binds claims
/// on any of these.
#[derive(Debug, Error)]
pub enum GateError {
    /// No credential was found and credentials are mandatory.
    #[error("no bearer token found")]
    MissingToken,

    /// A credential was presented but is structurally unusable (bad header
    /// shape, undecodable segments, unknown algorithm name).
    #[error("malformed bearer token")]
    MalformedToken(String),

    /// The token's declared algorithm is not one this gate accepts.
    /// Unsigned (`"none"`) tokens always land here.
    #[error("token algorithm not allowed: got {found}, want {expected}")]
    AlgorithmMismatch { expected: String, found: String },

    /// The caller's key resolver refused to produce a verification key.
    #[error("key resolution failed")]
    KeyResolution(#[source] BoxError),

    /// The signature did not verify under the resolved key.
    #[error("token signature mismatch")]
    SignatureMismatch,

    /// The token is outside its validity window (`exp` / `nbf`).
    #[error("token expired or not yet valid")]
    Expired,

    /// Any other failure inside the token codec.
    #[error("token verification failed")]
    Codec(#[source] jsonwebtoken::errors::Error),
}

impl GateError {
    /// Stable machine-readable code for the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedToken(_) => "MALFORMED_TOKEN",
            Self::AlgorithmMismatch { .. } => "ALGORITHM_MISMATCH",
            Self::KeyResolution(_) => "KEY_RESOLUTION_FAILED",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::Expired => "TOKEN_EXPIRED",
            Self::Codec(_) => "TOKEN_INVALID",
        }
    }

    /// Internal detail, surfaced by [`DefaultErrorHandler`] only in debug mode.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::MalformedToken(detail) => Some(detail.clone()),
            Self::KeyResolution(source) => Some(source.to_string()),
            Self::Codec(source) => Some(source.to_string()),
            Self::MissingToken
            | Self::AlgorithmMismatch { .. }
            | Self::SignatureMismatch
            | Self::Expired => None,
        }
    }
}

/// Strategy invoked when the gate halts a request.
///
/// Implemented for plain closures, so custom response formats (redirects,
/// problem+json, ...) do not need a dedicated type:
///
/// ```
/// use axum::http::StatusCode;
/// use axum::response::IntoResponse;
/// use token_gate::GateError;
///
/// let handler = |err: &GateError| {
///     (StatusCode::UNAUTHORIZED, format!("go away: {err}")).into_response()
/// };
/// # let _ = handler;
/// ```
pub trait ErrorHandler: Send + Sync {
    fn respond(&self, err: &GateError) -> Response;
}

impl<F> ErrorHandler for F
where
    F: Fn(&GateError) -> Response + Send + Sync,
{
    fn respond(&self, err: &GateError) -> Response {
        self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Default responder: 401 Unauthorized with a terse JSON error body.
///
/// With `debug` enabled the message also carries the underlying error detail.
/// Useful in development, an information leak in production; it is the
/// caller's job to keep it off there.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorHandler {
    pub debug: bool,
}

impl ErrorHandler for DefaultErrorHandler {
    fn respond(&self, err: &GateError) -> Response {
        let message = match (self.debug, err.detail()) {
            (true, Some(detail)) => format!("{err}: {detail}"),
            _ => err.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: err.code(),
                message,
            },
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
