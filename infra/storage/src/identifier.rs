use crate::error::StorageError;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Longest identifier accepted, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 200;

/// A validated blob identifier.
///
/// Identifiers become the final path component of a blob, so anything that
/// could address a different file is rejected: empty names, path separators,
/// NUL and other control characters, and names starting with `.` (which also
/// keeps `.` and `..` out, together with the store's own temp files).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn invalid(message: impl Into<Cow<'static, str>>, context: &'static str) -> StorageError {
    StorageError::InvalidIdentifier { message: message.into(), context: Some(context.into()) }
}

fn validate(value: &str) -> Result<(), StorageError> {
    if value.is_empty() {
        return Err(invalid("EMPTY", "Identifier cannot be empty"));
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(
            format!("{} bytes", value.len()),
            "Identifier exceeds the maximum length",
        ));
    }

    if value.starts_with('.') {
        return Err(invalid(value.to_owned(), "Identifier cannot start with a dot"));
    }

    if value.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(invalid(value.escape_default().to_string(), "Identifier contains illegal characters"));
    }

    Ok(())
}

impl TryFrom<&str> for Identifier {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        validate(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Identifier {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        validate(&value)?;
        Ok(Self(value))
    }
}

impl FromStr for Identifier {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
