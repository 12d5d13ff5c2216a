//! Patch decoding, authorization and batch splitting services.

#![forbid(unsafe_code)]

mod authorization_gate;
mod batch;
mod enforcer_ports;
mod operation;
mod patch_decoder;
mod patcher;
mod path_params;
mod schema_cache;

pub use authorization_gate::{AuthorizationGate, AuthorizedDecoder, QueryDecoder, QuerySet};
pub use batch::{Operation, Operations, split_operations};
pub use enforcer_ports::{Enforcer, ResourceCheck};
pub use operation::OperationKind;
pub use patch_decoder::{DecodedPatch, PatchDecoder, StructDecoder, Validator};
pub use patcher::{Dialect, Patcher, PrimaryKeys};
pub use path_params::PathParams;
pub use schema_cache::{ColumnMap, SchemaCache};
