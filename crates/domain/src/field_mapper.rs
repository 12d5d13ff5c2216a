use std::collections::HashMap;

use patchgate_core::{AppError, AppResult};

use crate::{FieldSchema, ResourceSchema};

/// Canonical field resolved from an external name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    /// Canonical field name.
    pub field: &'static str,
    /// The typed decoder understands this external name on its own.
    ///
    /// False for folded lowercase aliases, which only the presence map sees.
    pub wire_native: bool,
}

/// Lookup from external field identifiers to canonical field names.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    external: HashMap<String, FieldMatch>,
    fields: Vec<&'static str>,
}

impl FieldMapper {
    /// Builds the mapper of a resource type from its generated schema.
    pub fn new<R: ResourceSchema>() -> AppResult<Self> {
        Self::from_schema(R::schema())
    }

    /// Builds a mapper from a field table.
    pub fn from_schema(schema: &'static [FieldSchema]) -> AppResult<Self> {
        let mut mapper = Self {
            external: HashMap::new(),
            fields: Vec::new(),
        };

        for field in schema.iter().filter(|field| !field.ignored) {
            match field.rename {
                Some(rename) => {
                    mapper.register(rename, field.name, true, || {
                        format!("tag {rename} has multiple matches")
                    })?;
                }
                None => {
                    mapper.register(field.name, field.name, true, || {
                        format!("field name {} collides with another field tag", field.name)
                    })?;

                    let lowered = field.name.to_lowercase();
                    if lowered != field.name {
                        mapper.register(&lowered, field.name, false, || {
                            format!("field name {} has multiple matches", field.name)
                        })?;
                    }
                }
            }

            for alias in field.aliases {
                mapper.register(alias, field.name, true, || {
                    format!("tag {alias} has multiple matches")
                })?;
            }

            mapper.fields.push(field.name);
        }

        Ok(mapper)
    }

    fn register(
        &mut self,
        external: &str,
        field: &'static str,
        wire_native: bool,
        collision: impl FnOnce() -> String,
    ) -> AppResult<()> {
        if self.external.contains_key(external) {
            return Err(AppError::Schema(collision()));
        }

        self.external
            .insert(external.to_owned(), FieldMatch { field, wire_native });
        Ok(())
    }

    /// Returns the canonical field for an external name.
    #[must_use]
    pub fn struct_field_name(&self, external: &str) -> Option<&'static str> {
        self.resolve(external).map(|found| found.field)
    }

    /// Returns the canonical field and how it was matched.
    #[must_use]
    pub fn resolve(&self, external: &str) -> Option<FieldMatch> {
        self.external.get(external).copied()
    }

    /// Returns mapped canonical fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Returns the number of registered external names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.external.len()
    }

    /// Returns true when the type has no decodable field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }
}
