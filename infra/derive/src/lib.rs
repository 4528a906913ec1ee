#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the stash infrastructure crates.
//!
//! Only one macro lives here today: [`macro@stash_error`], which turns a plain enum into
//! a `thiserror` error with context helpers. Every infrastructure crate declares its
//! error type through it so that `?`, `.context(...)` and the `Display` format look the
//! same everywhere.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring an error enum.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every wrapped source error.
/// * **Conversions**: Implements `From<Source>` for variants holding a `source` field
///   (or a field marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Formatting**: Emits a private `format_context` helper for use inside `#[error(...)]`.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Variants must use named fields; tuple and unit variants are rejected.
/// 3. A variant that wraps a source must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[stash_derive::stash_error]
/// pub enum StorageError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Payload exceeds {limit} bytes{}", format_context(.context))]
///     TooLarge { limit: u64, context: Option<Cow<'static, str>> },
/// }
///
/// fn open(path: &std::path::Path) -> Result<std::fs::File, StorageError> {
///     std::fs::File::open(path).context("Opening blob")
/// }
/// ```
#[proc_macro_attribute]
pub fn stash_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
