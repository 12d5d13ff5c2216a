use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use patchgate_application::{Enforcer, ResourceCheck};
use patchgate_core::{AppResult, Domain, Permission, Resource, User};
use tokio::sync::RwLock;

use crate::PolicyDocument;

type Grants = HashMap<(User, Domain), HashMap<Permission, HashSet<Resource>>>;

/// In-memory enforcer backed by an explicit grant table.
#[derive(Debug, Default)]
pub struct InMemoryEnforcer {
    grants: RwLock<Grants>,
}

impl InMemoryEnforcer {
    /// Creates an enforcer that denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an enforcer holding every grant of `document`.
    #[must_use]
    pub fn from_policy(document: PolicyDocument) -> Self {
        let mut grants = Grants::new();
        for grant in document.grants {
            let by_permission = grants.entry((grant.user, grant.domain)).or_default();
            for permission in grant.permissions {
                by_permission
                    .entry(permission)
                    .or_default()
                    .extend(grant.resources.iter().cloned());
            }
        }

        Self {
            grants: RwLock::new(grants),
        }
    }

    /// Grants `permission` on `resource` to `user` within `domain`.
    pub async fn grant(
        &self,
        user: &User,
        domain: &Domain,
        permission: Permission,
        resource: impl Into<Resource>,
    ) {
        self.grants
            .write()
            .await
            .entry((user.clone(), domain.clone()))
            .or_default()
            .entry(permission)
            .or_default()
            .insert(resource.into());
    }

    /// Withdraws a grant made for exactly `resource`.
    pub async fn revoke(
        &self,
        user: &User,
        domain: &Domain,
        permission: Permission,
        resource: &Resource,
    ) {
        if let Some(resources) = self
            .grants
            .write()
            .await
            .get_mut(&(user.clone(), domain.clone()))
            .and_then(|by_permission| by_permission.get_mut(&permission))
        {
            resources.remove(resource);
        }
    }
}

fn covers(granted: &HashSet<Resource>, resource: &Resource) -> bool {
    if granted.contains(resource) {
        return true;
    }

    resource
        .as_str()
        .rsplit_once('.')
        .is_some_and(|(base, _)| granted.contains(&Resource::new(format!("{base}.*"))))
}

#[async_trait]
impl Enforcer for InMemoryEnforcer {
    async fn require_resources(
        &self,
        user: &User,
        domain: &Domain,
        permission: Permission,
        resources: &[Resource],
    ) -> AppResult<ResourceCheck> {
        let grants = self.grants.read().await;
        let granted = grants
            .get(&(user.clone(), domain.clone()))
            .and_then(|by_permission| by_permission.get(&permission));

        let missing = resources
            .iter()
            .filter(|resource| !granted.is_some_and(|granted| covers(granted, resource)))
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            user = %user,
            domain = %domain,
            permission = %permission,
            requested = resources.len(),
            missing = missing.len(),
            "evaluated resource grants"
        );

        if missing.is_empty() {
            Ok(ResourceCheck::Granted)
        } else {
            Ok(ResourceCheck::Missing(missing))
        }
    }
}
