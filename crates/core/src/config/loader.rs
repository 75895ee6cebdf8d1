use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("GPS_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(apply_credential_overrides(
        config,
        std::env::var("GPS_USERNAME").ok(),
        std::env::var("GPS_PASSWORD").ok(),
    ))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Credentials given through the environment win over the file.
pub fn apply_credential_overrides(
    mut config: Config,
    username: Option<String>,
    password: Option<String>,
) -> Config {
    if let Some(username) = username.filter(|u| !u.is_empty()) {
        config.credentials.username = username;
    }
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        config.credentials.password = password;
    }
    config
}
