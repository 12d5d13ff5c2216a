use std::collections::BTreeMap;
use std::sync::Arc;

use patchgate_core::{AppError, AppResult};
use patchgate_domain::{FieldValue, PatchSet, ResourceSchema};

use crate::schema_cache::ColumnMap;
use crate::SchemaCache;

/// SQL dialect used to render column lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Bare identifiers: `a, b`.
    Spanner,
    /// Quoted identifiers: `"a", "b"`.
    Postgres,
}

/// Primary key values by canonical field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryKeys {
    keys: BTreeMap<String, FieldValue>,
}

impl PrimaryKeys {
    /// Creates a key set holding one key.
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::default().add(field, value)
    }

    /// Adds a key.
    #[must_use]
    pub fn add(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.keys.insert(field.into(), value.into());
        self
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Maps patch sets onto the storage columns of a database type.
#[derive(Debug, Clone)]
pub struct Patcher {
    dialect: Dialect,
    cache: Arc<SchemaCache>,
}

impl Patcher {
    /// Creates a patcher with its own schema cache.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            cache: Arc::new(SchemaCache::new()),
        }
    }

    /// Returns the dialect the patcher renders.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Renders the columns of `D` for the patched fields in declaration order.
    pub fn columns<D, R>(&self, patch_set: &PatchSet<R>) -> AppResult<String>
    where
        D: ResourceSchema,
        R: ResourceSchema,
    {
        let columns = self.cache.columns::<D>()?;
        let names = patch_set
            .fields()
            .into_iter()
            .map(|field| column_of::<D>(&columns, field))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(match self.dialect {
            Dialect::Spanner => names.join(", "),
            Dialect::Postgres => format!("\"{}\"", names.join("\", \"")),
        })
    }

    /// Maps primary keys and patched values onto the columns of `D`.
    pub fn resolve<D, R>(
        &self,
        keys: &PrimaryKeys,
        patch_set: &PatchSet<R>,
    ) -> AppResult<BTreeMap<String, FieldValue>>
    where
        D: ResourceSchema,
        R: ResourceSchema,
    {
        if keys.is_empty() {
            return Err(AppError::Internal(
                "must include at least one primary key in call to resolve".to_owned(),
            ));
        }

        let columns = self.cache.columns::<D>()?;
        let mut resolved = BTreeMap::new();
        for (field, value) in &keys.keys {
            resolved.insert(
                column_of::<D>(&columns, field)?.to_owned(),
                value.clone(),
            );
        }
        for (field, value) in patch_set.iter() {
            resolved.insert(
                column_of::<D>(&columns, field)?.to_owned(),
                value.clone(),
            );
        }

        Ok(resolved)
    }
}

fn column_of<D: ResourceSchema>(columns: &ColumnMap, field: &str) -> AppResult<&'static str> {
    columns.column(field).ok_or_else(|| {
        AppError::Schema(format!("field {field} not found in {}", D::RESOURCE))
    })
}
