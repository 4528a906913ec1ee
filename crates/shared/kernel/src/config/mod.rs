use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use stash_domain::constants::{APP_NAME, ENV_PREFIX};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Custom error type for config loading.
#[stash_derive::stash_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from an optional file overlaid with environment variables.
///
/// 1. **Base File**: an explicit `path` must exist. Without one, `stash.{toml,yaml,json,...}`
///    in the working directory is used when present and skipped otherwise.
/// 2. **Environment Overrides**: variables prefixed with `STASH__`, nested with double
///    underscores (e.g., `STASH__STORAGE__DATA_DIR` maps to `storage.data_dir`).
///    Numeric and boolean values are parsed.
///
/// Keys missing from every source fall back to the target type's serde defaults.
///
/// # Errors
/// * The explicit configuration file cannot be found or parsed.
/// * The merged values do not match the structure of `T`.
///
/// # Example
/// ```rust
/// use stash_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .convert_case(config::Case::Snake)
        .try_parsing(true)
}

fn load_layered<T>(path: Option<impl AsRef<Path>>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path
        .map_or_else(|| (PathBuf::from(APP_NAME), false), |p| (p.as_ref().to_path_buf(), true));

    info!(path = %effective_path.display(), required, "Loading config");

    let config = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_domain::config::AppConfig;
    use std::fs;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        environment().source(Some(map))
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stash.toml");
        fs::write(&file, "[server]\nport = 8081\n\n[storage]\ndata_dir = \"/srv/blobs\"\n").unwrap();

        let cfg: AppConfig = load_layered(Some(&file), env(&[])).unwrap();
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("/srv/blobs"));
        assert_eq!(cfg.storage.shard_depth, 2);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stash.toml");
        fs::write(&file, "[server]\nport = 8081\n").unwrap();

        let overrides = env(&[
            ("STASH__SERVER__PORT", "9090"),
            ("STASH__STORAGE__MAX_UPLOAD_BYTES", "1024"),
            ("STASH__LOG__JSON", "true"),
        ]);
        let cfg: AppConfig = load_layered(Some(&file), overrides).unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.max_upload_bytes, 1024);
        assert!(cfg.log.json);
    }

    #[test]
    fn missing_default_file_is_optional() {
        let cfg: AppConfig = load_layered(None::<&Path>, env(&[])).unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<AppConfig, _> =
            load_layered(Some(dir.path().join("absent.toml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::Config { .. })));
    }
}
