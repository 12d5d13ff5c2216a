//! Implementation of `#[derive(ResourceSchema)]`.

use darling::FromMeta;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, LitStr, Token, parse2};

/// Parsed `#[patch(...)]` attributes on the struct.
#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct ContainerAttr {
    /// Base resource name.
    resource: Option<String>,
}

/// Parsed `#[patch(...)]` attributes on a field.
#[derive(Debug, Default, FromMeta)]
#[darling(default)]
struct FieldAttr {
    perm: Option<String>,
    column: Option<String>,
    compare: Option<String>,
}

enum Compare {
    Comparable,
    Serialize,
    Display,
}

#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    aliases: Vec<String>,
    ignored: bool,
}

struct FieldModel {
    ident: Ident,
    name: String,
    serde: SerdeField,
    permissions: Vec<TokenStream>,
    column: String,
    compare: Compare,
}

/// Expand `#[derive(ResourceSchema)]`.
pub fn expand(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    check_container_serde(name, &input.attrs)?;
    let container = container_attr(&input.attrs)?;
    let resource = container.resource.unwrap_or_else(|| name.to_string());

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "ResourceSchema can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            name,
            "ResourceSchema requires a struct with named fields",
        ));
    };

    let fields = named
        .named
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            field_model(ident, &field.attrs)
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let table = fields.iter().map(schema_entry);
    let value_arms = fields
        .iter()
        .filter(|field| !field.serde.ignored)
        .map(value_arm);
    let assign_arms = fields
        .iter()
        .filter(|field| !field.serde.ignored)
        .map(assign_arm);

    Ok(quote! {
        impl #impl_generics ::patchgate_domain::ResourceSchema for #name #ty_generics #where_clause {
            const RESOURCE: &'static str = #resource;

            fn schema() -> &'static [::patchgate_domain::FieldSchema] {
                const FIELDS: &[::patchgate_domain::FieldSchema] = &[#(#table),*];
                FIELDS
            }

            fn field_value(
                &self,
                field: &str,
            ) -> ::patchgate_domain::__private::AppResult<
                ::core::option::Option<::patchgate_domain::FieldValue>,
            > {
                match field {
                    #(#value_arms)*
                    _ => ::core::result::Result::Ok(::core::option::Option::None),
                }
            }

            fn assign_json(
                &mut self,
                field: &str,
                value: ::patchgate_domain::__private::serde_json::Value,
            ) -> ::patchgate_domain::__private::AppResult<bool> {
                match field {
                    #(#assign_arms)*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Ok(false)
                    }
                }
            }
        }
    })
}

/// Partial bodies omit fields, so the typed decode must fall back to defaults.
fn check_container_serde(name: &Ident, attrs: &[Attribute]) -> syn::Result<()> {
    let mut defaulted = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                return Err(meta.error(
                    "ResourceSchema does not support `rename_all`; rename fields individually",
                ));
            }
            if meta.path.is_ident("default") {
                defaulted = true;
            }
            skip_meta(&meta)
        })?;
    }

    if defaulted {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            name,
            "ResourceSchema requires `#[serde(default)]` on the struct so partial bodies decode",
        ))
    }
}

fn container_attr(attrs: &[Attribute]) -> syn::Result<ContainerAttr> {
    let mut container = ContainerAttr::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("patch")) {
        let parsed = ContainerAttr::from_meta(&attr.meta)
            .map_err(|error| syn::Error::new_spanned(attr, error))?;
        container.resource = parsed.resource.or(container.resource);
    }
    Ok(container)
}

fn field_model(ident: Ident, attrs: &[Attribute]) -> syn::Result<FieldModel> {
    let name = ident.unraw().to_string();
    let mut model = FieldModel {
        column: name.clone(),
        permissions: Vec::new(),
        compare: Compare::Comparable,
        serde: serde_field(attrs)?,
        ident,
        name,
    };

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("patch")) {
        let parsed =
            FieldAttr::from_meta(&attr.meta).map_err(|error| syn::Error::new_spanned(attr, error))?;
        if let Some(perm) = parsed.perm {
            model.permissions =
                parse_permissions(&perm).map_err(|message| syn::Error::new_spanned(attr, message))?;
        }
        if let Some(column) = parsed.column {
            model.column = column;
        }
        if let Some(strategy) = parsed.compare {
            model.compare =
                parse_compare(&strategy).map_err(|message| syn::Error::new_spanned(attr, message))?;
        }
    }

    Ok(model)
}

fn serde_field(attrs: &[Attribute]) -> syn::Result<SerdeField> {
    let mut serde = SerdeField::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    serde.rename = Some(value.value());
                } else {
                    meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("deserialize") {
                            let value: LitStr = inner.value()?.parse()?;
                            serde.rename = Some(value.value());
                            Ok(())
                        } else {
                            skip_meta(&inner)
                        }
                    })?;
                }
                Ok(())
            } else if meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                serde.aliases.push(value.value());
                Ok(())
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                serde.ignored = true;
                Ok(())
            } else {
                skip_meta(&meta)
            }
        })?;
    }

    Ok(serde)
}

/// Consumes a serde meta item this derive does not interpret.
fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }
    Ok(())
}

fn parse_permissions(value: &str) -> Result<Vec<TokenStream>, String> {
    if value.trim() == "required" {
        return Ok(["Create", "Read", "Update", "Delete"]
            .into_iter()
            .map(permission_tokens)
            .collect());
    }

    value
        .split(',')
        .map(|part| match part.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(permission_tokens("Create")),
            "read" => Ok(permission_tokens("Read")),
            "update" => Ok(permission_tokens("Update")),
            "delete" => Ok(permission_tokens("Delete")),
            other => Err(format!(
                "unknown permission `{other}`; expected `required` or a list of create, read, update, delete"
            )),
        })
        .collect()
}

fn permission_tokens(variant: &str) -> TokenStream {
    let variant = Ident::new(variant, proc_macro2::Span::call_site());
    quote! { ::patchgate_domain::__private::Permission::#variant }
}

fn parse_compare(value: &str) -> Result<Compare, String> {
    match value {
        "serialize" => Ok(Compare::Serialize),
        "display" => Ok(Compare::Display),
        other => Err(format!(
            "unknown compare strategy `{other}`; expected `serialize` or `display`"
        )),
    }
}

fn schema_entry(field: &FieldModel) -> TokenStream {
    let name = &field.name;
    let rename = match &field.serde.rename {
        Some(rename) => quote! { ::core::option::Option::Some(#rename) },
        None => quote! { ::core::option::Option::None },
    };
    let aliases = &field.serde.aliases;
    let ignored = field.serde.ignored;
    let permissions = &field.permissions;
    let column = &field.column;

    quote! {
        ::patchgate_domain::FieldSchema {
            name: #name,
            rename: #rename,
            aliases: &[#(#aliases),*],
            ignored: #ignored,
            permissions: &[#(#permissions),*],
            column: #column,
        }
    }
}

fn value_arm(field: &FieldModel) -> TokenStream {
    let name = &field.name;
    let ident = &field.ident;
    let capture = match field.compare {
        Compare::Comparable => {
            quote! { ::patchgate_domain::Comparable::to_field_value(&self.#ident) }
        }
        Compare::Serialize => quote! { ::patchgate_domain::FieldValue::serialized(&self.#ident) },
        Compare::Display => quote! { ::patchgate_domain::FieldValue::display(&self.#ident) },
    };

    quote! {
        #name => #capture.map(::core::option::Option::Some),
    }
}

fn assign_arm(field: &FieldModel) -> TokenStream {
    let name = &field.name;
    let ident = &field.ident;

    quote! {
        #name => {
            self.#ident = ::patchgate_domain::__private::serde_json::from_value(value).map_err(
                |error| {
                    ::patchgate_domain::__private::AppError::bad_request_with(
                        ::std::format!("invalid value for field {}", #name),
                        error,
                    )
                },
            )?;
            ::core::result::Result::Ok(true)
        }
    }
}
