use std::collections::BTreeMap;

use patchgate_core::{AppError, AppResult};
use serde::Serialize;

use crate::{FieldValue, PatchSet, ResourceSchema};

/// Stored and proposed value of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffElem {
    /// Value held by the existing entity.
    pub old: FieldValue,
    /// Value carried by the patch set.
    pub new: FieldValue,
}

/// Returns the fields of `patch_set` whose value differs from `old`.
///
/// `E` and `R` may be different types as long as every patched field exists
/// on both. A field missing from `E` is a schema error; values that cannot be
/// compared produce [`AppError::TypeMismatch`].
pub fn diff<E, R>(old: &E, patch_set: &PatchSet<R>) -> AppResult<BTreeMap<String, DiffElem>>
where
    E: ResourceSchema,
    R: ResourceSchema,
{
    let mut changes = BTreeMap::new();

    for (field, new) in patch_set.iter() {
        let Some(stored) = old.field_value(field)? else {
            return Err(AppError::Schema(format!(
                "field {field} does not exist on {}",
                E::RESOURCE
            )));
        };

        let equal = stored
            .matches(new)
            .map_err(|mismatch| mismatch.into_error(field))?;

        if !equal {
            changes.insert(
                field.to_owned(),
                DiffElem {
                    old: stored,
                    new: new.clone(),
                },
            );
        }
    }

    Ok(changes)
}
