//! Configuration validation logic.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a GatewayConfig for semantic correctness.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError(format!(
            "listener.bind_address '{}' is not a valid socket address",
            config.listener.bind_address
        )));
    }

    match config.upstream.url.parse::<axum::http::Uri>() {
        Ok(uri) => {
            if uri.scheme().is_none() || uri.authority().is_none() {
                errors.push(ValidationError(format!(
                    "upstream.url '{}' must be an absolute http(s) URL",
                    config.upstream.url
                )));
            }
        }
        Err(_) => {
            errors.push(ValidationError(format!(
                "upstream.url '{}' is not a valid URL",
                config.upstream.url
            )));
        }
    }

    if config.upstream.request_secs == 0 {
        errors.push(ValidationError(
            "upstream.request_secs must be > 0".to_string(),
        ));
    }

    if config.analytics.enabled {
        if config.analytics.index.is_empty() {
            errors.push(ValidationError("analytics.index must not be empty".to_string()));
        }
        if config.analytics.queue_capacity == 0 {
            errors.push(ValidationError(
                "analytics.queue_capacity must be > 0".to_string(),
            ));
        }
        if config.analytics.workers == 0 {
            errors.push(ValidationError("analytics.workers must be > 0".to_string()));
        }
    }

    for user in &config.auth.users {
        if user.username.is_empty() {
            errors.push(ValidationError("auth.users entries need a username".to_string()));
        }
    }
    for permission in &config.auth.permissions {
        if permission.username.is_empty() {
            errors.push(ValidationError(
                "auth.permissions entries need a username".to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_upstream_url() {
        let mut config = GatewayConfig::default();
        config.upstream.url = "127.0.0.1:9200".to_string();
        let errs = validate_config(&config).unwrap_err();
        assert!(errs[0].0.contains("upstream.url"));
    }

    #[test]
    fn test_zero_queue_capacity_rejected_when_enabled() {
        let mut config = GatewayConfig::default();
        config.analytics.queue_capacity = 0;
        assert!(validate_config(&config).is_err());

        config.analytics.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
