use http::Method;
use patchgate_core::{AppError, AppResult, Permission};

/// Logical kind of a single-resource change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `add` in a batch, `POST` otherwise.
    Create,
    /// `patch` in a batch, `PATCH` otherwise.
    Update,
    /// `remove` in a batch, `DELETE` otherwise.
    Delete,
}

impl OperationKind {
    /// Maps an HTTP method to its operation kind.
    pub fn from_method(method: &Method) -> AppResult<Self> {
        match *method {
            Method::POST => Ok(Self::Create),
            Method::PATCH => Ok(Self::Update),
            Method::DELETE => Ok(Self::Delete),
            _ => Err(AppError::bad_request(format!("unsupported method, {method}"))),
        }
    }

    /// Maps a batch envelope `op` to its operation kind, ignoring case.
    pub fn from_op(op: &str) -> AppResult<Self> {
        match op.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Create),
            "patch" => Ok(Self::Update),
            "remove" => Ok(Self::Delete),
            _ => Err(AppError::bad_request(format!("unsupported operation {op:?}"))),
        }
    }

    /// Returns the equivalent HTTP method.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::Create => Method::POST,
            Self::Update => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    /// Returns the permission authorizing this kind of change.
    #[must_use]
    pub fn permission(self) -> Permission {
        match self {
            Self::Create => Permission::Create,
            Self::Update => Permission::Update,
            Self::Delete => Permission::Delete,
        }
    }

    /// Returns whether the change addresses an existing resource by path.
    #[must_use]
    pub fn addresses_existing(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}
