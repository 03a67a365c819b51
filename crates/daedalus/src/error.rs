//! Error types for the Daedalus facade.
//!
//! Two families live here. [`DaedalusError`] covers everything that can go
//! wrong while assembling an [`Application`](crate::Application): broken
//! route declarations, configuration problems, logging setup. Once an
//! application is built, dispatch never fails as a whole; a handler that
//! cannot complete returns a [`HandlerError`] and the dispatcher turns it
//! into an error response.

use daedalus_config::ConfigError;
use daedalus_router::RouterError;
use daedalus_telemetry::TelemetryError;
use http::StatusCode;
use thiserror::Error;

/// Result type for application assembly.
pub type DaedalusResult<T> = Result<T, DaedalusError>;

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors raised while building an application.
#[derive(Debug, Error)]
pub enum DaedalusError {
    /// A route declaration was rejected by the routing engine.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// The configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The logging subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// A route declaration names a handler missing from the registry.
    #[error("route `{pattern}` refers to unknown handler `{handler}`")]
    UnknownHandler {
        /// The handler name from the declaration.
        handler: String,
        /// The pattern of the declaring route.
        pattern: String,
    },
}

impl DaedalusError {
    /// Creates an unknown handler error.
    pub fn unknown_handler(handler: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::UnknownHandler {
            handler: handler.into(),
            pattern: pattern.into(),
        }
    }
}

/// A failure reported by a handler or filter.
///
/// Carries the status the dispatcher should answer with, which defaults to
/// `500 Internal Server Error`.
///
/// # Example
///
/// ```rust
/// use daedalus::HandlerError;
/// use http::StatusCode;
///
/// let err = HandlerError::new("database unavailable");
/// assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
///
/// let err = HandlerError::with_status(StatusCode::FORBIDDEN, "admin only");
/// assert_eq!(err.to_string(), "admin only");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    status: StatusCode,
    message: String,
}

impl HandlerError {
    /// Creates an internal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Creates an error answered with `status`.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a `400 Bad Request` error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    /// Status code for the error response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
