mod env;
mod loader;
mod types;
mod validate;

pub use env::{StoreEnvironment, STORE_ROOT_VAR};
pub use loader::{apply_credential_overrides, load_config, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "'S3_ID', 'S3_KEY', 'S3_BUCKET', 'S3_INPUT', 'S3_OUTPUT' and 'S3_SYNC' \
         environment variables must be set (missing: {})",
        .0.join(", ")
    )]
    MissingEnvironment(Vec<String>),
}
