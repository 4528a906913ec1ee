use stash_derive::stash_error;
use std::borrow::Cow;

#[stash_error]
pub enum BlobError {
    #[error("I/O failure{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Payload exceeds {limit} bytes{}", format_context(.context))]
    TooLarge { limit: u64, context: Option<Cow<'static, str>> },

    #[error("Invalid blob name{}: {message}", format_context(.context))]
    InvalidName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_missing() -> Result<Vec<u8>, BlobError> {
    std::fs::read("/definitely/not/here").context("Reading blob")
}

fn main() {
    let err = read_missing().expect_err("path does not exist");
    assert!(err.to_string().contains("(Reading blob)"));

    let too_large: Result<(), BlobError> =
        Err(BlobError::TooLarge { limit: 10, context: None });
    let err = too_large.context("upload").expect_err("still an error");
    assert_eq!(err.to_string(), "Payload exceeds 10 bytes (upload)");

    let invalid: Result<(), BlobError> =
        Err(BlobError::InvalidName { message: Cow::Borrowed("empty"), context: None });
    let err = invalid.context("parsing").expect_err("still an error");
    assert_eq!(err.to_string(), "Invalid blob name (parsing): empty");
}
