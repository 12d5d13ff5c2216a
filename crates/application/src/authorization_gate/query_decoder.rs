use std::marker::PhantomData;
use std::sync::Arc;

use patchgate_core::{AppError, AppResult, Domain, Permission, User};
use patchgate_domain::{FieldMapper, ResourceDescriptor, ResourceSchema};

use crate::{Enforcer, ResourceCheck, SchemaCache};

/// Fields an identity may read, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet {
    fields: Vec<&'static str>,
}

impl QuerySet {
    /// Returns the readable fields.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Returns whether `field` is readable.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Returns the number of readable fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when no field is readable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Read-path field filter.
pub struct QueryDecoder<R> {
    mapper: Arc<FieldMapper>,
    descriptor: ResourceDescriptor,
    enforcer: Arc<dyn Enforcer>,
    target: PhantomData<fn() -> R>,
}

impl<R: ResourceSchema> QueryDecoder<R> {
    /// Creates a query decoder backed by the process-wide schema cache.
    pub fn new(enforcer: Arc<dyn Enforcer>) -> AppResult<Self> {
        Self::with_cache(SchemaCache::global(), enforcer)
    }

    /// Creates a query decoder backed by `cache`.
    pub fn with_cache(cache: &SchemaCache, enforcer: Arc<dyn Enforcer>) -> AppResult<Self> {
        Ok(Self {
            mapper: cache.field_mapper::<R>()?,
            descriptor: ResourceDescriptor::new::<R>(),
            enforcer,
            target: PhantomData,
        })
    }

    /// Returns the fields of `R` that `user` may read.
    ///
    /// Requires read access on the base resource, then keeps each field that
    /// is not gated or whose field resource is readable. Ending up with no
    /// field at all is forbidden rather than an empty projection.
    pub async fn decode(&self, user: &User, domain: &Domain) -> AppResult<QuerySet> {
        let permission = Permission::Read;
        let base = self.descriptor.base_resource();

        if let ResourceCheck::Missing(missing) = self
            .enforcer
            .require_resources(user, domain, permission, std::slice::from_ref(base))
            .await?
        {
            return Err(AppError::forbidden(
                format!("identity {user} lacks {permission} on {base}"),
                permission,
                missing,
            ));
        }

        let mut fields = Vec::with_capacity(self.mapper.fields().len());
        for field in self.mapper.fields() {
            if !self.descriptor.permission_required(field, permission) {
                fields.push(*field);
                continue;
            }

            let resource = self.descriptor.resource(field);
            if self
                .enforcer
                .require_resources(user, domain, permission, std::slice::from_ref(&resource))
                .await?
                .is_granted()
            {
                fields.push(*field);
            }
        }

        if fields.is_empty() {
            return Err(AppError::forbidden(
                format!("identity {user} lacks {permission} on any fields in {base}"),
                permission,
                Vec::new(),
            ));
        }

        tracing::debug!(resource = %base, fields = fields.len(), "resolved readable fields");
        Ok(QuerySet { fields })
    }
}
