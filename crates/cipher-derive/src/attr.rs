//! Parsing of the `#[encrypted]` field attribute.

use syn::{Attribute, Expr, ExprLit, Lit, Meta};

const USAGE: &str = "expected #[encrypted], #[encrypted = true] or #[encrypted = false]";

/// Reads the sensitive flag from a field's attributes. Absent means `false`.
pub(crate) fn sensitive(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut flag = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("encrypted")) {
        if flag.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[encrypted] attribute"));
        }
        flag = Some(match &attr.meta {
            Meta::Path(_) => true,
            Meta::NameValue(nv) => parse_flag(&nv.value)?,
            Meta::List(list) => return Err(syn::Error::new_spanned(list, USAGE)),
        });
    }
    Ok(flag.unwrap_or(false))
}

fn parse_flag(expr: &Expr) -> syn::Result<bool> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(b), ..
        }) => Ok(b.value),
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => match s.value().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(syn::Error::new_spanned(s, USAGE)),
        },
        other => Err(syn::Error::new_spanned(other, USAGE)),
    }
}
