/// Service name, also the prefix of rolling log files.
pub const APP_NAME: &str = "stash";

/// Length of identifiers generated for anonymous uploads.
pub const GENERATED_ID_LEN: usize = 12;

/// Upload cap applied when nothing is configured: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Directory levels between the data directory and a blob.
pub const DEFAULT_SHARD_DEPTH: usize = 2;

pub const DEFAULT_PORT: u16 = 3000;

/// Prefix of environment overrides, e.g. `STASH__SERVER__PORT`.
pub const ENV_PREFIX: &str = "STASH";
