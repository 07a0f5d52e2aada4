use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for a broadsheet server.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// Session verification settings for the hosted identity service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret the identity service signs session tokens with.
    pub session_secret: Option<SecretString>,
}

/// Payment provider settings.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Secret API key for the provider (`sk_test_...` / `sk_live_...`).
    pub secret_key: Option<SecretString>,
    /// Shared secret for webhook signature verification (`whsec_...`).
    pub webhook_secret: Option<SecretString>,
    /// Price identifier for the single subscription tier.
    pub price_id: String,
    /// Public base URL of the site, used to build checkout redirect URLs.
    pub app_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection string; when absent the server runs on in-memory stores.
    pub url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig { session_secret: None },
            billing: BillingConfig::default(),
            database: DatabaseConfig { url: None },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            price_id: String::new(),
            app_base_url: "https://localhost".to_string(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Read an environment variable with the `BROADSHEET_` prefix.
fn get_env_with_prefix(name: &str) -> Option<String> {
    std::env::var(format!("BROADSHEET_{name}")).ok()
}

/// Builder for [`Config`] with environment variable support.
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_session_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.config.auth.session_secret = Some(secret.into());
        self
    }

    pub fn with_provider_secret_key(mut self, key: impl Into<SecretString>) -> Self {
        self.config.billing.secret_key = Some(key.into());
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.config.billing.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_price_id(mut self, price_id: impl Into<String>) -> Self {
        self.config.billing.price_id = price_id.into();
        self
    }

    pub fn with_app_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.billing.app_base_url = url.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Server and logging settings use the `BROADSHEET_` prefix; provider
    /// credentials follow their conventional names (`STRIPE_SECRET_KEY`,
    /// `STRIPE_WEBHOOK_SECRET`), and `DATABASE_URL`/`PORT` are honored for
    /// hosted-platform compatibility.
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = get_env_with_prefix("PORT").or_else(|| std::env::var("PORT").ok()) {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(secret) = get_env_with_prefix("SESSION_SECRET") {
            self.config.auth.session_secret = Some(secret.into());
        }
        if let Ok(key) = std::env::var("STRIPE_SECRET_KEY") {
            self.config.billing.secret_key = Some(key.into());
        }
        if let Ok(secret) = std::env::var("STRIPE_WEBHOOK_SECRET") {
            self.config.billing.webhook_secret = Some(secret.into());
        }
        if let Some(price_id) = get_env_with_prefix("PRICE_ID") {
            self.config.billing.price_id = price_id;
        }
        if let Some(url) = get_env_with_prefix("APP_URL") {
            self.config.billing.app_base_url = url;
        }
        if let Some(url) = get_env_with_prefix("DATABASE_URL")
            .or_else(|| std::env::var("DATABASE_URL").ok())
        {
            self.config.database.url = Some(url);
        }
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            crate::error::AppError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        if self.config.server.port == 0 {
            return Err(crate::error::AppError::bad_request(
                "Server port must be greater than 0",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(crate::error::AppError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        url::Url::parse(&self.config.billing.app_base_url).map_err(|e| {
            crate::error::AppError::bad_request(format!(
                "Invalid app base URL {}: {}",
                self.config.billing.app_base_url, e
            ))
        })?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_cleanly() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert!(config.database.url.is_none());
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ConfigBuilder::new()
            .with_host("127.0.0.1")
            .with_port(3000)
            .with_log_level("debug")
            .with_price_id("price_premium_monthly")
            .with_app_base_url("https://example.com")
            .build()
            .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.billing.price_id, "price_premium_monthly");
    }

    #[test]
    fn invalid_log_level_rejected() {
        let result = ConfigBuilder::new().with_log_level("verbose").build();
        assert!(result.is_err());
    }

    #[test]
    fn invalid_app_url_rejected() {
        let result = ConfigBuilder::new().with_app_base_url("not a url").build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_port_rejected() {
        let result = ConfigBuilder::new().with_port(0).build();
        assert!(result.is_err());
    }
}
