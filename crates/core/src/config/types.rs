use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("helpdesk.db")
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhooksConfig {
    /// Account that authors comments appended from channel events.
    /// Created on first use.
    #[serde(default = "default_system_user_email")]
    pub system_user_email: String,
    #[serde(default = "default_system_user_name")]
    pub system_user_name: String,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            system_user_email: default_system_user_email(),
            system_user_name: default_system_user_name(),
        }
    }
}

fn default_system_user_email() -> String {
    "system@helpdesk.local".to_string()
}

fn default_system_user_name() -> String {
    "Helpdesk Bot".to_string()
}

/// Outbound customer notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// When false, notifications are only logged.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub email_endpoint: Option<String>,
    #[serde(default)]
    pub whatsapp_endpoint: Option<String>,
    /// Sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            email_endpoint: None,
            whatsapp_endpoint: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub webhooks: WebhooksConfig,
    pub notifications: SanitizedNotificationsConfig,
}

/// Sanitized notifications config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationsConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_endpoint: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let n = &config.notifications;
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            webhooks: config.webhooks.clone(),
            notifications: SanitizedNotificationsConfig {
                enabled: n.enabled,
                email_endpoint: n.email_endpoint.clone(),
                whatsapp_endpoint: n.whatsapp_endpoint.clone(),
                api_key_configured: n.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                timeout_secs: n.timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "helpdesk.db");
        assert_eq!(config.webhooks.system_user_email, "system@helpdesk.local");
        assert_eq!(config.webhooks.system_user_name, "Helpdesk Bot");
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.timeout_secs, 10);
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[database]
path = "/data/my-db.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "/data/my-db.sqlite");
    }

    #[test]
    fn test_deserialize_with_notifications() {
        let toml = r#"
[notifications]
enabled = true
whatsapp_endpoint = "https://wa.internal/messages"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let n = &config.notifications;
        assert!(n.enabled);
        assert_eq!(n.whatsapp_endpoint.as_deref(), Some("https://wa.internal/messages"));
        assert!(n.email_endpoint.is_none());
        assert_eq!(n.timeout_secs, 10); // default
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            notifications: NotificationsConfig {
                enabled: true,
                api_key: Some("secret-key".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.notifications.api_key_configured);
        assert_eq!(sanitized.server.port, 8080);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_sanitized_config_without_key() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(!sanitized.notifications.api_key_configured);
        assert_eq!(sanitized.database.path.to_str().unwrap(), "helpdesk.db");
    }
}
