//! Validation helpers for configuration documents.

use crate::error::{ConfigError, ConfigResult};
use crate::model::ReclaimerConfig;

/// Check every field that has a bound. Returns the first violation found.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the section, field and reason.
pub fn validate(config: &ReclaimerConfig) -> ConfigResult<()> {
    require_non_empty("database", "url", &config.database.url)?;
    require_positive(
        "database",
        "max_connections",
        u64::from(config.database.max_connections),
    )?;
    require_positive(
        "database",
        "acquire_timeout_secs",
        config.database.acquire_timeout_secs,
    )?;

    let dest_root = config.general.dest_root.to_string_lossy();
    require_non_empty("general", "dest_root", &dest_root)?;
    require_positive(
        "general",
        "max_threads",
        u64::try_from(config.general.max_threads).unwrap_or(u64::MAX),
    )?;
    require_positive("general", "max_tasks", u64::from(config.general.max_tasks))?;

    require_positive(
        "runtime",
        "operation_timeout_secs",
        config.runtime.operation_timeout_secs,
    )?;
    require_positive("runtime", "poll_idle_ms", config.runtime.poll_idle_ms)?;
    require_non_empty("logging", "level", &config.logging.level)?;
    Ok(())
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section,
            field,
            value: None,
            reason: "must_not_be_empty",
        });
    }
    Ok(())
}

fn require_positive(section: &'static str, field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(
            section,
            field,
            value,
            "must_be_positive",
        ));
    }
    Ok(())
}
