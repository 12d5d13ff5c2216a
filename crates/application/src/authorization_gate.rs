mod authorized_decoder;
mod query_decoder;

use std::sync::Arc;

use patchgate_core::{AppError, AppResult, Domain, Permission, Resource, User, format_resources};
use patchgate_domain::{PatchSet, ResourceDescriptor, ResourceSchema};

use crate::{Enforcer, ResourceCheck};

pub use authorized_decoder::AuthorizedDecoder;
pub use query_decoder::{QueryDecoder, QuerySet};

/// Write-path authorization of patch sets.
#[derive(Clone)]
pub struct AuthorizationGate {
    enforcer: Arc<dyn Enforcer>,
}

impl AuthorizationGate {
    /// Creates a gate consulting `enforcer`.
    #[must_use]
    pub fn new(enforcer: Arc<dyn Enforcer>) -> Self {
        Self { enforcer }
    }

    /// Returns the resources a patch set touches under `permission`: the base
    /// resource followed by every changed field gated under it.
    #[must_use]
    pub fn resources<R: ResourceSchema>(
        patch_set: &PatchSet<R>,
        descriptor: &ResourceDescriptor,
        permission: Permission,
    ) -> Vec<Resource> {
        std::iter::once(descriptor.base_resource().clone())
            .chain(
                patch_set
                    .fields()
                    .into_iter()
                    .filter(|field| descriptor.permission_required(field, permission))
                    .map(|field| descriptor.resource(field)),
            )
            .collect()
    }

    /// Ensures `user` holds `permission` on every resource the patch set
    /// touches, with a single enforcer call.
    pub async fn authorize<R: ResourceSchema>(
        &self,
        patch_set: &PatchSet<R>,
        descriptor: &ResourceDescriptor,
        user: &User,
        domain: &Domain,
        permission: Permission,
    ) -> AppResult<()> {
        let resources = Self::resources(patch_set, descriptor, permission);
        self.require(user, domain, permission, &resources).await
    }

    /// Ensures `user` holds `permission` on the base resource only.
    pub async fn authorize_base(
        &self,
        descriptor: &ResourceDescriptor,
        user: &User,
        domain: &Domain,
        permission: Permission,
    ) -> AppResult<()> {
        let resources = [descriptor.base_resource().clone()];
        self.require(user, domain, permission, &resources).await
    }

    async fn require(
        &self,
        user: &User,
        domain: &Domain,
        permission: Permission,
        resources: &[Resource],
    ) -> AppResult<()> {
        match self
            .enforcer
            .require_resources(user, domain, permission, resources)
            .await?
        {
            ResourceCheck::Granted => Ok(()),
            ResourceCheck::Missing(missing) => {
                tracing::info!(
                    user = %user,
                    domain = %domain,
                    permission = %permission,
                    missing = missing.len(),
                    "authorization denied"
                );
                Err(AppError::forbidden(
                    format!(
                        "identity {user} lacks {permission} on {}",
                        format_resources(&missing)
                    ),
                    permission,
                    missing,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests;
