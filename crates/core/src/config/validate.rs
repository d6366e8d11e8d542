use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - The webhook system user has a usable email
/// - Notification timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let email = config.webhooks.system_user_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ConfigError::ValidationError(format!(
            "webhooks.system_user_email is not a valid email: '{}'",
            email
        )));
    }

    if config.notifications.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "notifications.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NotificationsConfig, ServerConfig, WebhooksConfig};
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_system_email() {
        for email in ["", "   ", "helpdesk-bot"] {
            let config = Config {
                webhooks: WebhooksConfig {
                    system_user_email: email.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(matches!(
                validate_config(&config),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let config = Config {
            notifications: NotificationsConfig {
                timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
