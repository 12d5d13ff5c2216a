use patchgate_core::{Permission, Resource};

use crate::{FieldSchema, ResourceSchema};

/// Per-resource permission table and naming scheme.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    base: Resource,
    fields: &'static [FieldSchema],
}

impl ResourceDescriptor {
    /// Builds the descriptor of a resource type from its generated schema.
    #[must_use]
    pub fn new<R: ResourceSchema>() -> Self {
        Self::from_schema(Resource::new(R::RESOURCE), R::schema())
    }

    /// Builds a descriptor from a base resource and a field table.
    #[must_use]
    pub fn from_schema(base: Resource, fields: &'static [FieldSchema]) -> Self {
        Self { base, fields }
    }

    /// Returns the resource addressing the whole entity.
    #[must_use]
    pub fn base_resource(&self) -> &Resource {
        &self.base
    }

    /// Returns the resource addressing one field, `base.field`.
    #[must_use]
    pub fn resource(&self, field: &str) -> Resource {
        self.base.field(field)
    }

    /// Returns whether `field` is gated under `permission`.
    #[must_use]
    pub fn permission_required(&self, field: &str, permission: Permission) -> bool {
        self.schema(field)
            .is_some_and(|schema| schema.requires(permission))
    }

    /// Returns whether `field` is gated under any permission.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.schema(field)
            .is_some_and(|schema| !schema.permissions.is_empty())
    }

    /// Returns fields gated under `permission`, in declaration order.
    pub fn required_fields(&self, permission: Permission) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(move |schema| schema.requires(permission))
            .map(|schema| schema.name)
    }

    /// Returns every declared field in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|schema| schema.name)
    }

    fn schema(&self, field: &str) -> Option<&'static FieldSchema> {
        self.fields.iter().find(|schema| schema.name == field)
    }
}
