use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use patchgate_core::{AppError, AppResult, Resource};

use crate::{FieldValue, ResourceSchema};

/// Fields present in an inbound payload with their decoded values.
///
/// Entries are kept in the declaration order of `R` regardless of the order
/// they were inserted in.
pub struct PatchSet<R> {
    resource: Resource,
    entries: Vec<(&'static str, FieldValue)>,
    target: PhantomData<fn() -> R>,
}

impl<R: ResourceSchema> PatchSet<R> {
    /// Creates an empty patch set for `R`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resource: Resource::new(R::RESOURCE),
            entries: Vec::new(),
            target: PhantomData,
        }
    }

    /// Sets the value of a canonical field, replacing any previous value.
    pub fn set(&mut self, field: &str, value: FieldValue) -> AppResult<()> {
        let schema = R::schema();
        let Some(index) = schema.iter().position(|entry| entry.name == field) else {
            return Err(AppError::Schema(format!(
                "{} has no field named {field}",
                R::RESOURCE
            )));
        };
        let name = schema[index].name;

        match self.entries.binary_search_by_key(&index, |(existing, _)| {
            declared_index(schema, existing)
        }) {
            Ok(position) => self.entries[position].1 = value,
            Err(position) => self.entries.insert(position, (name, value)),
        }

        Ok(())
    }

    /// Returns the changed fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(field, _)| *field).collect()
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    /// Returns whether the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates fields and values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.entries.iter().map(|(field, value)| (*field, value))
    }

    /// Returns the number of present fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the base resource of `R`.
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

fn declared_index(schema: &[crate::FieldSchema], field: &str) -> usize {
    schema
        .iter()
        .position(|entry| entry.name == field)
        .unwrap_or(usize::MAX)
}

impl<R: ResourceSchema> Default for PatchSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for PatchSet<R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            entries: self.entries.clone(),
            target: PhantomData,
        }
    }
}

impl<R> Debug for PatchSet<R> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PatchSet")
            .field("resource", &self.resource)
            .field("entries", &self.entries)
            .finish()
    }
}
