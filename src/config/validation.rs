use crate::config::types::{CollectorConfig, Config, HttpConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_collector_config(&config.collector)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    validate_web_url("seed-url", &config.seed_url)?;

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.batch_size < 1 || config.batch_size > 1_000 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.shutdown_grace_secs < 1 {
        return Err(ConfigError::Validation(
            "shutdown-grace-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    validate_web_url("phone-endpoint", &config.phone_endpoint)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Accepts absolute http(s) URLs only
fn validate_web_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> CollectorConfig {
        CollectorConfig {
            seed_url: "https://auto.ria.com/uk/search/?page=1".to_string(),
            max_concurrent_requests: 5,
            batch_size: 10,
            batch_delay_ms: 0,
            page_delay_ms: 0,
            autosave_interval_secs: 30,
            shutdown_grace_secs: 10,
        }
    }

    #[test]
    fn test_valid_collector_config() {
        assert!(validate_collector_config(&collector()).is_ok());
    }

    #[test]
    fn test_concurrency_out_of_range() {
        let mut config = collector();
        config.max_concurrent_requests = 101;
        assert!(validate_collector_config(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = collector();
        config.batch_size = 0;
        assert!(validate_collector_config(&config).is_err());
    }

    #[test]
    fn test_validate_web_url() {
        assert!(validate_web_url("seed-url", "https://auto.ria.com/").is_ok());
        assert!(validate_web_url("seed-url", "http://127.0.0.1:8080/search").is_ok());

        assert!(matches!(
            validate_web_url("seed-url", "not a url"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_web_url("seed-url", "ftp://auto.ria.com/"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let http = HttpConfig {
            user_agent: "  ".to_string(),
            ..HttpConfig::default()
        };
        assert!(validate_http_config(&http).is_err());
    }
}
