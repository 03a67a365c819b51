//! Error types for the routing engine.
//!
//! Every variant here is raised either while a router is being assembled
//! (fatal to bootstrap) or by an explicit reverse-routing call. Failing to
//! find a route for a request is not an error; see [`MatchResult`](crate::MatchResult).

use thiserror::Error;

/// Result type alias using [`RouterError`].
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors produced by the routing engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A media type string could not be parsed.
    #[error("malformed media type `{value}`: {reason}")]
    MalformedMediaType {
        /// The offending input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A route registration argument was rejected.
    #[error("invalid route argument: {message}")]
    InvalidRouteArgument {
        /// Human-readable error message.
        message: String,
    },

    /// A path pattern could not be compiled.
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern as declared.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Reverse routing was called with arguments that do not fit the pattern.
    #[error("cannot reverse `{pattern}`: {message}")]
    ReverseArgumentMismatch {
        /// The pattern being reversed.
        pattern: String,
        /// What was wrong with the arguments.
        message: String,
    },

    /// No route is registered under the requested name.
    #[error("no route named `{name}`")]
    UnknownRoute {
        /// The requested route name.
        name: String,
    },
}

impl RouterError {
    /// Creates a malformed media type error.
    #[must_use]
    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMediaType {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid route argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidRouteArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a reverse argument mismatch error.
    #[must_use]
    pub fn reverse_mismatch(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReverseArgumentMismatch {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error can only happen while building a router.
    #[must_use]
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedMediaType { .. }
                | Self::InvalidRouteArgument { .. }
                | Self::InvalidPattern { .. }
        )
    }
}
