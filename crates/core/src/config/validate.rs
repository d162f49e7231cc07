use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - qBittorrent URL is present and well-formed enough to use
/// - Worker pool size is not 0
/// - Autobrr fallback delete age is not negative
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.qbittorrent.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "qbittorrent.url cannot be empty".to_string(),
        ));
    }

    if !config.qbittorrent.url.starts_with("http://")
        && !config.qbittorrent.url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(format!(
            "qbittorrent.url must start with http:// or https://, got '{}'",
            config.qbittorrent.url
        )));
    }

    if config.options.workers == 0 {
        return Err(ConfigError::ValidationError(
            "options.workers cannot be 0".to_string(),
        ));
    }

    if config.options.default_autobrr_delete_days < 0 {
        return Err(ConfigError::ValidationError(
            "options.default_autobrr_delete_days cannot be negative".to_string(),
        ));
    }

    Ok(())
}
