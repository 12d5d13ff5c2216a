//! Derive macro for `patchgate_domain::ResourceSchema`.

#![forbid(unsafe_code)]

mod resource_schema;

use proc_macro::TokenStream;

/// Generates the static field table and field accessors of a resource.
///
/// # Usage
///
/// ```ignore
/// use patchgate_domain::ResourceSchema;
///
/// #[derive(Default, serde::Deserialize, ResourceSchema)]
/// #[serde(default)]
/// #[patch(resource = "contacts")]
/// struct Contact {
///     #[serde(rename = "fullName")]
///     name: String,
///     #[patch(perm = "required", column = "contact_email")]
///     email: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[patch(resource = "...")]` on the struct: base resource name, defaults
///   to the struct name.
/// - `#[patch(perm = "required")]`: gate the field under every permission.
///   A comma-separated list (`"create,update"`) gates it under those only.
/// - `#[patch(column = "...")]`: storage column, defaults to the field name.
/// - `#[patch(compare = "serialize" | "display")]`: compare the field by its
///   serialized form or its `Display` output instead of `Comparable`.
///
/// The struct must carry `#[serde(default)]` (or `#[serde(default = "...")]`):
/// request bodies are partial and absent fields fall back to the default.
///
/// serde's `rename`, `alias`, `skip` and `skip_deserializing` field
/// attributes are honored. `rename_all` is rejected.
#[proc_macro_derive(ResourceSchema, attributes(patch))]
pub fn derive_resource_schema(input: TokenStream) -> TokenStream {
    resource_schema::expand(input.into())
        .unwrap_or_else(|error| error.to_compile_error())
        .into()
}
