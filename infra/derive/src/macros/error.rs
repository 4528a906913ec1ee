use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, FieldsNamed, GenericArgument, Ident,
    PathArguments, Type, Variant,
};

/// What the expansion needs to know about one enum variant.
struct VariantInfo<'a> {
    ident: &'a Ident,
    source: Option<&'a Field>,
    has_context: bool,
    cfgs: Vec<Attribute>,
}

pub fn expand(input: DeriveInput) -> TokenStream {
    let Data::Enum(data) = &input.data else {
        return syn::Error::new_spanned(&input.ident, "stash_error can only be applied to enums")
            .to_compile_error();
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        match inspect_variant(variant) {
            Ok(info) => variants.push(info),
            Err(err) => return err.to_compile_error(),
        }
    }

    let name = &input.ident;
    let ext = format_ident!("{}Ext", name);

    let derives = missing_derives(&input);
    let context_trait = context_trait(name, &ext, &variants);
    let source_impls = variants.iter().filter_map(|v| source_impls(name, &ext, v));

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #derives
        #input

        #context_trait
        #(#source_impls)*

        #[allow(dead_code)]
        fn format_context(
            context: &Option<std::borrow::Cow<'static, str>>,
        ) -> std::borrow::Cow<'static, str> {
            match context {
                Some(c) => std::borrow::Cow::Owned(format!(" ({c})")),
                None => std::borrow::Cow::Borrowed(""),
            }
        }
    }
}

fn inspect_variant(variant: &Variant) -> Result<VariantInfo<'_>, syn::Error> {
    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(
            variant,
            "stash_error variants must use named fields (e.g. `Io { source, context }`)",
        ));
    };

    let has_context = context_field(fields)?.is_some();
    let source = fields.named.iter().find(|f| is_source(f));

    if source.is_some() && !has_context {
        return Err(syn::Error::new_spanned(
            &variant.ident,
            "stash_error variants wrapping a source need `context: Option<Cow<'static, str>>`",
        ));
    }

    Ok(VariantInfo {
        ident: &variant.ident,
        source,
        has_context,
        cfgs: variant.attrs.iter().filter(|a| a.path().is_ident("cfg")).cloned().collect(),
    })
}

fn context_field(fields: &FieldsNamed) -> Result<Option<&Field>, syn::Error> {
    let Some(field) = fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == "context"))
    else {
        return Ok(None);
    };

    if is_cow_static_str_option(&field.ty) {
        Ok(Some(field))
    } else {
        Err(syn::Error::new_spanned(&field.ty, "context field must be Option<Cow<'static, str>>"))
    }
}

fn is_source(field: &Field) -> bool {
    field.ident.as_ref().is_some_and(|i| i == "source")
        || field.attrs.iter().any(|a| a.path().is_ident("source") || a.path().is_ident("from"))
}

fn missing_derives(input: &DeriveInput) -> TokenStream {
    let mut present = FxHashSet::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                present.insert(last.ident.to_string());
            }
            Ok(())
        });
    }

    let mut wanted = Vec::new();
    if !present.contains("Debug") {
        wanted.push(quote! { Debug });
    }
    if !present.contains("Error") {
        wanted.push(quote! { ::thiserror::Error });
    }

    if wanted.is_empty() { quote! {} } else { quote! { #[derive(#(#wanted),*)] } }
}

fn context_trait(name: &Ident, ext: &Ident, variants: &[VariantInfo<'_>]) -> TokenStream {
    let arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let cfgs = &v.cfgs;
        let ident = v.ident;
        quote! { #(#cfgs)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
    });

    quote! {
        pub trait #ext<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut err| {
                    match &mut err {
                        #(#arms)*
                        _ => {}
                    }
                    err
                })
            }
        }
    }
}

fn source_impls(name: &Ident, ext: &Ident, v: &VariantInfo<'_>) -> Option<TokenStream> {
    let field = v.source?;
    let field_ident = field.ident.as_ref()?;
    let ty = &field.ty;
    let ident = v.ident;
    let cfgs = &v.cfgs;

    Some(quote! {
        #(#cfgs)*
        #[automatically_derived]
        impl From<#ty> for #name {
            #[inline]
            fn from(#field_ident: #ty) -> Self {
                Self::#ident { #field_ident, context: None }
            }
        }

        #(#cfgs)*
        impl<T> #ext<T> for std::result::Result<T, #ty> {
            #[inline]
            fn context(
                self,
                context: impl Into<std::borrow::Cow<'static, str>>,
            ) -> std::result::Result<T, #name> {
                self.map_err(|#field_ident| #name::#ident {
                    #field_ident,
                    context: Some(context.into()),
                })
            }
        }
    })
}

/// Matches `Option<Cow<'static, str>>` (with or without a path prefix on `Cow`).
fn is_cow_static_str_option(ty: &Type) -> bool {
    let Some(option_arg) = single_generic(ty, "Option") else {
        return false;
    };
    let Type::Path(cow) = option_arg else {
        return false;
    };
    let Some(seg) = cow.path.segments.last() else {
        return false;
    };
    if seg.ident != "Cow" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return false;
    };

    let mut args = args.args.iter();
    matches!(args.next(), Some(GenericArgument::Lifetime(lt)) if lt.ident == "static")
        && matches!(
            args.next(),
            Some(GenericArgument::Type(Type::Path(p)))
                if p.path.segments.last().is_some_and(|s| s.ident == "str")
        )
}

fn single_generic<'a>(ty: &'a Type, outer: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let seg = path.path.segments.last()?;
    if seg.ident != outer {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expanded(input: DeriveInput) -> String {
        expand(input).to_string().replace(' ', "")
    }

    fn expands_to_error(input: DeriveInput) -> bool {
        expanded(input).contains("compile_error")
    }

    #[test]
    fn accepts_source_with_context() {
        let input: DeriveInput = parse_quote! {
            pub enum BlobError {
                #[error("io")]
                Io { source: std::io::Error, context: Option<Cow<'static, str>> },
                #[error("too large")]
                TooLarge { limit: u64, context: Option<Cow<'static, str>> },
            }
        };
        let out = expanded(input);
        assert!(!out.contains("compile_error"));
        assert!(out.contains("BlobErrorExt"));
        assert!(out.contains("implFrom<std::io::Error>forBlobError"));
    }

    #[test]
    fn rejects_source_without_context() {
        let input: DeriveInput = parse_quote! {
            pub enum BlobError {
                #[error("io")]
                Io { source: std::io::Error },
            }
        };
        assert!(expands_to_error(input));
    }

    #[test]
    fn rejects_wrong_context_type() {
        let input: DeriveInput = parse_quote! {
            pub enum BlobError {
                #[error("io")]
                Io { source: std::io::Error, context: Option<String> },
            }
        };
        assert!(expands_to_error(input));
    }

    #[test]
    fn rejects_tuple_variants_and_structs() {
        let tuple: DeriveInput = parse_quote! {
            pub enum BlobError {
                #[error("io")]
                Io(std::io::Error),
            }
        };
        assert!(expands_to_error(tuple));

        let strukt: DeriveInput = parse_quote! {
            pub struct NotAnEnum { field: u8 }
        };
        assert!(expands_to_error(strukt));
    }

    #[test]
    fn plain_variants_get_no_conversions() {
        let input: DeriveInput = parse_quote! {
            pub enum BlobError {
                #[error("invalid")]
                Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
            }
        };
        let out = expanded(input);
        assert!(!out.contains("compile_error"));
        assert!(!out.contains("implFrom<"));
    }

    #[test]
    fn keeps_existing_debug_derive() {
        let input: DeriveInput = parse_quote! {
            #[derive(Debug)]
            pub enum BlobError {
                #[error("invalid")]
                Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
            }
        };
        assert_eq!(expanded(input).matches("Debug").count(), 1);
    }
}
