use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use patchgate_core::{AppError, AppResult};
use patchgate_domain::{FieldMapper, ResourceSchema};

/// Storage column names of one resource type, keyed by canonical field.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<&'static str, &'static str>,
}

impl ColumnMap {
    /// Builds the column map of `R` from its generated schema.
    #[must_use]
    pub fn new<R: ResourceSchema>() -> Self {
        Self {
            columns: R::schema()
                .iter()
                .filter(|field| !field.column.is_empty())
                .map(|field| (field.name, field.column))
                .collect(),
        }
    }

    /// Returns the column of a canonical field.
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&'static str> {
        self.columns.get(field).copied()
    }
}

type Entries<V> = RwLock<HashMap<TypeId, Arc<V>>>;

/// Process-wide cache of per-type schema artifacts.
///
/// Each artifact is built at most once per type: readers share a read lock,
/// and only the first build of a type takes the write lock.
#[derive(Debug, Default)]
pub struct SchemaCache {
    mappers: Entries<FieldMapper>,
    columns: Entries<ColumnMap>,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache shared by the whole process.
    pub fn global() -> &'static Self {
        static CACHE: OnceLock<SchemaCache> = OnceLock::new();
        CACHE.get_or_init(Self::new)
    }

    /// Returns the field mapper of `R`, building it on first use.
    pub fn field_mapper<R: ResourceSchema>(&self) -> AppResult<Arc<FieldMapper>> {
        get_or_build(&self.mappers, TypeId::of::<R>(), FieldMapper::new::<R>)
    }

    /// Returns the column map of `R`, building it on first use.
    pub fn columns<R: ResourceSchema>(&self) -> AppResult<Arc<ColumnMap>> {
        get_or_build(&self.columns, TypeId::of::<R>(), || Ok(ColumnMap::new::<R>()))
    }
}

fn get_or_build<V>(
    entries: &Entries<V>,
    key: TypeId,
    build: impl FnOnce() -> AppResult<V>,
) -> AppResult<Arc<V>> {
    if let Some(found) = entries.read().map_err(|_| poisoned())?.get(&key) {
        return Ok(Arc::clone(found));
    }

    let mut entries = entries.write().map_err(|_| poisoned())?;
    if let Some(found) = entries.get(&key) {
        return Ok(Arc::clone(found));
    }

    let built = Arc::new(build()?);
    entries.insert(key, Arc::clone(&built));
    tracing::debug!(entries = entries.len(), "cached resource schema artifact");
    Ok(built)
}

fn poisoned() -> AppError {
    AppError::Internal("schema cache lock poisoned".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use patchgate_domain::ResourceSchema;
    use serde::Deserialize;

    use super::SchemaCache;

    #[derive(Debug, Default, Deserialize, ResourceSchema)]
    #[serde(default)]
    struct Account {
        #[patch(column = "account_name")]
        name: String,
        balance: i64,
    }

    #[derive(Debug, Default, Deserialize, ResourceSchema)]
    #[serde(default)]
    struct Broken {
        #[serde(rename = "value")]
        first: String,
        #[serde(alias = "value")]
        second: String,
    }

    #[test]
    fn builds_each_mapper_once() {
        let cache = SchemaCache::new();

        let first = cache
            .field_mapper::<Account>()
            .unwrap_or_else(|_| unreachable!());
        let second = cache
            .field_mapper::<Account>()
            .unwrap_or_else(|_| unreachable!());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fields(), &["name", "balance"]);
    }

    #[test]
    fn schema_errors_are_not_cached() {
        let cache = SchemaCache::new();

        assert!(cache.field_mapper::<Broken>().is_err());
        assert!(cache.field_mapper::<Broken>().is_err());
    }

    #[test]
    fn column_map_uses_overrides() {
        let cache = SchemaCache::new();
        let columns = cache.columns::<Account>().unwrap_or_else(|_| unreachable!());

        assert_eq!(columns.column("name"), Some("account_name"));
        assert_eq!(columns.column("balance"), Some("balance"));
        assert_eq!(columns.column("missing"), None);
    }

    #[test]
    fn concurrent_readers_share_one_mapper() {
        let cache = SchemaCache::new();

        let mappers = std::thread::scope(|scope| {
            let handles = (0..8)
                .map(|_| scope.spawn(|| cache.field_mapper::<Account>()))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok().and_then(Result::ok))
                .collect::<Vec<_>>()
        });

        assert_eq!(mappers.len(), 8);
        assert!(mappers.iter().all(|mapper| Arc::ptr_eq(mapper, &mappers[0])));
    }
}
