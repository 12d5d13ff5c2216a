use std::path::Path;

use patchgate_core::{AppError, AppResult, Domain, Permission, Resource, User};
use serde::Deserialize;

/// Static grant list loaded into an [`crate::InMemoryEnforcer`].
///
/// ```json
/// { "grants": [
///     { "user": "alice", "permissions": ["read", "update"],
///       "resources": ["contacts", "contacts.*"] }
/// ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PolicyDocument {
    /// Grants in file order.
    #[serde(default)]
    pub grants: Vec<PolicyGrant>,
}

/// Permissions one user holds on a set of resources within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolicyGrant {
    /// Identity receiving the grant.
    pub user: User,
    /// Domain the grant applies in, `global` when omitted.
    #[serde(default)]
    pub domain: Domain,
    /// Permissions granted.
    pub permissions: Vec<Permission>,
    /// Resources covered. `base.*` covers every field resource of `base`.
    pub resources: Vec<Resource>,
}

impl PolicyDocument {
    /// Parses a policy document from JSON.
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json)
            .map_err(|error| AppError::Internal(format!("invalid policy document: {error}")))
    }

    /// Reads and parses the policy document at `path`.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| {
            AppError::Internal(format!(
                "failed to read policy document '{}': {error}",
                path.display()
            ))
        })?;

        Self::from_json(&json)
    }
}
