use std::borrow::Cow;

/// A specialized [`StorageError`] enum of this crate.
///
/// "Not found" is deliberately absent: a missing blob is reported as an empty
/// [`Item`](crate::Item) or `exists == false`, never as an error.
#[stash_derive::stash_error]
pub enum StorageError {
    #[error("Payload too large{}: more than {limit} bytes", format_context(.context))]
    TooLarge { limit: u64, context: Option<Cow<'static, str>> },

    #[error("Invalid identifier{}: {message}", format_context(.context))]
    InvalidIdentifier { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

impl StorageError {
    #[must_use]
    pub const fn too_large(limit: u64) -> Self {
        Self::TooLarge { limit, context: None }
    }

    #[must_use]
    pub const fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}
