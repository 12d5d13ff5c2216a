//! Shared primitives for all patchgate crates.

#![forbid(unsafe_code)]

/// Identity, scope and permission primitives consumed by the enforcer.
pub mod access;

use thiserror::Error;

pub use access::{Domain, Permission, Resource, User};

/// Result type used across patchgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Boxed error for failures raised by collaborators this crate does not own.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure categories produced by the patch pipeline.
///
/// Every failure maps to exactly one variant so that a response encoder can
/// translate it deterministically.
#[derive(Debug, Error)]
pub enum AppError {
    /// Static schema of a resource type is inconsistent, or a caller paired
    /// types that do not share a field.
    #[error("schema error: {0}")]
    Schema(String),

    /// Caller supplied input that cannot be accepted as-is.
    #[error("bad request: {message}{}", describe_source(.source))]
    BadRequest {
        /// Client-facing message.
        message: String,
        /// Underlying decode or validation failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Identity lacks a permission on one or more resources.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Client-facing message.
        message: String,
        /// Permission that was evaluated.
        permission: Permission,
        /// Resources the identity was missing, empty when not reported.
        missing: Vec<Resource>,
    },

    /// Two values of the same field could not be compared.
    #[error("type mismatch on field '{field}': cannot compare {old_type} with {new_type}")]
    TypeMismatch {
        /// Canonical field name.
        field: String,
        /// Runtime type of the stored value.
        old_type: String,
        /// Runtime type of the proposed value.
        new_type: String,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Opaque failure from an enforcer or the body stream.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[source] BoxError),
}

impl AppError {
    /// Creates a bad request without an underlying cause.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a bad request wrapping the failure that caused it.
    #[must_use]
    pub fn bad_request_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::BadRequest {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a forbidden error for the resources the identity is missing.
    #[must_use]
    pub fn forbidden(
        message: impl Into<String>,
        permission: Permission,
        missing: Vec<Resource>,
    ) -> Self {
        Self::Forbidden {
            message: message.into(),
            permission,
            missing,
        }
    }

    /// Wraps a collaborator failure without classifying it.
    #[must_use]
    pub fn infrastructure(source: impl Into<BoxError>) -> Self {
        Self::Infrastructure(source.into())
    }

    /// Returns the message intended for the client, if the failure has one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::BadRequest { message, .. } | Self::Forbidden { message, .. } => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Returns true when the caller can fix the failure by changing its input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest { .. } | Self::Forbidden { .. })
    }
}

fn describe_source(source: &Option<BoxError>) -> String {
    source
        .as_ref()
        .map(|error| format!(": {error}"))
        .unwrap_or_default()
}

/// Renders resources as a bracketed list for error messages.
#[must_use]
pub fn format_resources(resources: &[Resource]) -> String {
    let names = resources
        .iter()
        .map(Resource::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    format!("[{names}]")
}
