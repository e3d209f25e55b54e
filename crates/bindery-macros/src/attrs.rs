//! Attribute parsing for `#[bindery(...)]`.

use syn::{Attribute, LitStr};

/// Parsed `#[bindery(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Override name (default: Rust type name)
    pub name: Option<String>,
}

impl TypeAttrs {
    /// Parse attributes from a list of `#[bindery(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bindery") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() || value.value().contains("::") {
                        return Err(syn::Error::new(
                            value.span(),
                            "bindery name must be a single non-empty constant name",
                        ));
                    }
                    result.name = Some(value.value());
                } else {
                    return Err(meta.error(format!(
                        "unknown bindery attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}
