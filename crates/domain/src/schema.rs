use patchgate_core::{AppResult, Permission};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::FieldValue;

/// Static description of one struct field, generated by
/// `#[derive(ResourceSchema)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    /// Canonical field name (the Rust field identifier).
    pub name: &'static str,
    /// Explicit external name from `#[serde(rename = "...")]`.
    pub rename: Option<&'static str>,
    /// Additional external names from `#[serde(alias = "...")]`.
    pub aliases: &'static [&'static str],
    /// Field is never read from request bodies.
    pub ignored: bool,
    /// Permission kinds that gate this field.
    pub permissions: &'static [Permission],
    /// Storage column name.
    pub column: &'static str,
}

impl FieldSchema {
    /// Returns the name the typed decoder expects on the wire.
    #[must_use]
    pub fn external_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }

    /// Returns whether the field is gated under `permission`.
    #[must_use]
    pub fn requires(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Wire-representable resource with a compile-time field table.
///
/// Implementations are generated by `#[derive(ResourceSchema)]`; the
/// generated table lists fields in declaration order.
pub trait ResourceSchema: DeserializeOwned + Send + 'static {
    /// Base resource name used for authorization.
    const RESOURCE: &'static str;

    /// Returns the fields of the type in declaration order.
    fn schema() -> &'static [FieldSchema];

    /// Returns the comparable value of `field`, or `None` when the type has
    /// no such field.
    fn field_value(&self, field: &str) -> AppResult<Option<FieldValue>>;

    /// Decodes `value` into `field`. Returns `false` when the type has no
    /// such decodable field.
    fn assign_json(&mut self, field: &str, value: Value) -> AppResult<bool>;

    /// Looks up the static schema entry of `field`.
    fn field_schema(field: &str) -> Option<&'static FieldSchema> {
        Self::schema().iter().find(|schema| schema.name == field)
    }
}
