//! Locating, parsing and finalising the configuration document.
//!
//! # Design
//! - Resolution order: explicit path, `RECLAIMER_CONFIG`, then `reclaimer.yaml` beside the
//!   executable.
//! - Environment overrides are applied through an injectable lookup so tests never touch
//!   the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ReclaimerConfig;
use crate::validate::validate;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "RECLAIMER_CONFIG";
/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "RECLAIMER_LOG_LEVEL";
/// File name looked up beside the executable when nothing else is configured.
pub const DEFAULT_CONFIG_FILE: &str = "reclaimer.yaml";

/// Decide which file to load.
///
/// # Errors
///
/// Returns an error when no explicit path is given and the executable location cannot be
/// determined.
pub fn resolve_config_path(explicit: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let exe = std::env::current_exe().map_err(|source| ConfigError::Io {
        operation: "config.current_exe",
        path: None,
        source,
    })?;
    let dir = exe.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok(dir.join(DEFAULT_CONFIG_FILE))
}

/// Load, override from the process environment, and validate the document at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load(path: &Path) -> ConfigResult<ReclaimerConfig> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load`] with a caller-supplied environment lookup.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_with<F>(path: &Path, lookup: F) -> ConfigResult<ReclaimerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: Some(path.to_path_buf()),
        source,
    })?;
    let mut config = parse_document(&raw).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })?;
    apply_overrides(&mut config, lookup);
    validate(&config)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Parse a YAML document without applying overrides or validation.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the document is malformed or has unknown keys.
pub fn parse_document(raw: &str) -> ConfigResult<ReclaimerConfig> {
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
}

fn apply_overrides<F>(config: &mut ReclaimerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(DATABASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
        debug!(variable = DATABASE_URL_ENV, "database url overridden from environment");
        config.database.url = url;
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|value| !value.trim().is_empty()) {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogFormatSetting;
    use std::collections::HashMap;
    use std::time::Duration;

    type TestResult<T> = anyhow::Result<T>;

    const FULL_DOCUMENT: &str = r"
database:
  url: mysql://pacs:pw@db:3306/pacs
  max_connections: 12
  acquire_timeout_secs: 5
general:
  dest_root: /data
  dest_code: 3
  max_threads: 4
  max_tasks: 50
runtime:
  poll_idle_ms: 250
  operation_timeout_secs: 15
logging:
  level: debug
  format: json
  file: ./logs/reclaimer.log
";

    const MINIMAL_DOCUMENT: &str = r"
database:
  url: mysql://pacs:pw@db:3306/pacs
  max_connections: 2
general:
  dest_root: /data
  dest_code: 7
  max_threads: 1
  max_tasks: 1
";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(contents: &str) -> TestResult<(tempfile::TempDir, PathBuf)> {
        let dir = tempfile::Builder::new().prefix("reclaimer-config-").tempdir()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, contents)?;
        Ok((dir, path))
    }

    #[test]
    fn full_document_parses_every_section() -> TestResult<()> {
        let config = parse_document(FULL_DOCUMENT)?;
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.database.acquire_timeout(), Duration::from_secs(5));
        assert_eq!(config.general.dest_root, PathBuf::from("/data"));
        assert_eq!(config.general.dest_code, 3);
        assert_eq!(config.general.max_threads, 4);
        assert_eq!(config.general.max_tasks, 50);
        assert_eq!(config.runtime.poll_idle(), Duration::from_millis(250));
        assert_eq!(config.logging.format, Some(LogFormatSetting::Json));
        assert_eq!(
            config.logging.file.as_deref(),
            Some(Path::new("./logs/reclaimer.log"))
        );
        Ok(())
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() -> TestResult<()> {
        let config = parse_document(MINIMAL_DOCUMENT)?;
        assert_eq!(config.database.acquire_timeout_secs, 10);
        assert_eq!(config.runtime.poll_idle_ms, 1_000);
        assert_eq!(config.runtime.operation_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.format.is_none());
        assert!(config.logging.file.is_none());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = MINIMAL_DOCUMENT.replace("max_tasks: 1", "max_tasks: 1\n  max_task: 2");
        assert!(matches!(
            parse_document(&raw),
            Err(ConfigError::Parse { path: None, .. })
        ));
    }

    #[test]
    fn load_with_applies_environment_overrides() -> TestResult<()> {
        let (_dir, path) = write_config(MINIMAL_DOCUMENT)?;
        let env: HashMap<&str, &str> = HashMap::from([
            (DATABASE_URL_ENV, "mysql://other:pw@replica/pacs"),
            (LOG_LEVEL_ENV, "trace"),
        ]);
        let config = load_with(&path, |name| env.get(name).map(ToString::to_string))?;
        assert_eq!(config.database.url, "mysql://other:pw@replica/pacs");
        assert_eq!(config.logging.level, "trace");
        Ok(())
    }

    #[test]
    fn blank_environment_values_are_ignored() -> TestResult<()> {
        let (_dir, path) = write_config(MINIMAL_DOCUMENT)?;
        let config = load_with(&path, |name| {
            (name == DATABASE_URL_ENV).then(|| "  ".to_string())
        })?;
        assert_eq!(config.database.url, "mysql://pacs:pw@db:3306/pacs");
        Ok(())
    }

    #[test]
    fn load_with_reports_missing_file_with_path() {
        let missing = PathBuf::from("definitely/missing/reclaimer.yaml");
        match load_with(&missing, no_env) {
            Err(ConfigError::Io { operation, path, .. }) => {
                assert_eq!(operation, "config.read");
                assert_eq!(path.as_deref(), Some(missing.as_path()));
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn load_with_attaches_path_to_parse_errors() -> TestResult<()> {
        let (_dir, path) = write_config("database: [")?;
        match load_with(&path, no_env) {
            Err(ConfigError::Parse {
                path: Some(reported),
                ..
            }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn load_with_validates_after_overrides() -> TestResult<()> {
        let document = MINIMAL_DOCUMENT.replace("max_threads: 1", "max_threads: 0");
        let (_dir, path) = write_config(&document)?;
        assert!(matches!(
            load_with(&path, no_env),
            Err(ConfigError::InvalidField {
                field: "max_threads",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn explicit_path_wins_resolution() -> TestResult<()> {
        let explicit = Path::new("/etc/reclaimer/custom.yaml");
        assert_eq!(resolve_config_path(Some(explicit))?, explicit);
        Ok(())
    }
}
