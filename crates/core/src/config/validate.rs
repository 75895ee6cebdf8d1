use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Catalog credentials are present
/// - Paging, chunking and scheduling values are non-zero
/// - Server port is not 0 when the status endpoint is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.credentials.is_complete() {
        return Err(ConfigError::ValidationError(
            "credentials.username and credentials.password must be set (or GPS_USERNAME / GPS_PASSWORD)"
                .to_string(),
        ));
    }

    if config.catalog.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.chunk_size cannot be 0".to_string(),
        ));
    }

    if config.search.rows == 0 {
        return Err(ConfigError::ValidationError(
            "search.rows cannot be 0".to_string(),
        ));
    }

    if config.scheduler.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.interval_secs cannot be 0".to_string(),
        ));
    }

    if config.scheduler.completeness_depth == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.completeness_depth must be at least 1".to_string(),
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
