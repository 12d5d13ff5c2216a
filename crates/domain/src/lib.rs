//! Resource schemas, field mapping and change-set primitives.

#![forbid(unsafe_code)]

extern crate self as patchgate_domain;

mod descriptor;
mod diff;
mod field_mapper;
mod patch_set;
mod schema;
mod value;

pub use descriptor::ResourceDescriptor;
pub use diff::{DiffElem, diff};
pub use field_mapper::{FieldMapper, FieldMatch};
pub use patch_set::PatchSet;
pub use patchgate_derive::ResourceSchema;
pub use schema::{FieldSchema, ResourceSchema};
pub use value::{Comparable, FieldValue, Scalar, TypeMismatch};

#[doc(hidden)]
pub mod __private {
    pub use patchgate_core::{AppError, AppResult, Permission};
    pub use serde_json;
}
