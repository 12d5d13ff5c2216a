use async_trait::async_trait;
use patchgate_core::{AppResult, Domain, Permission, Resource, User};

/// Outcome of a batched resource check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceCheck {
    /// The identity holds the permission on every resource.
    Granted,
    /// The identity lacks the permission on these resources.
    Missing(Vec<Resource>),
}

impl ResourceCheck {
    /// Returns whether every resource was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Authorization decision port.
///
/// Implementations decide; this crate only consumes the decision. An `Err`
/// means the enforcer could not decide and is never treated as a denial.
#[async_trait]
pub trait Enforcer: Send + Sync {
    /// Checks `permission` on all `resources` in one call.
    async fn require_resources(
        &self,
        user: &User,
        domain: &Domain,
        permission: Permission,
        resources: &[Resource],
    ) -> AppResult<ResourceCheck>;
}
