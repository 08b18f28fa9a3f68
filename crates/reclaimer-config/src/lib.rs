#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! File-backed configuration for the reclaimer service.
//!
//! Layout: `model.rs` (typed documents), `loader.rs` (path resolution, parsing and
//! environment overrides), `validate.rs` (field checks), `error.rs` (error type).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_PATH_ENV, DATABASE_URL_ENV, DEFAULT_CONFIG_FILE, LOG_LEVEL_ENV, load, load_with,
    parse_document, resolve_config_path,
};
pub use model::{
    DatabaseConfig, GeneralConfig, LogFormatSetting, LoggingSettings, ReclaimerConfig,
    RuntimeConfig,
};
pub use validate::validate;
