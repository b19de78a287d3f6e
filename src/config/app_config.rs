use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub users: UsersConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Token lifetimes and signing settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub issuer: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    /// Active sessions kept per user; 0 disables the limit
    pub max_sessions_per_user: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UsersConfig {
    /// Activate accounts at creation instead of leaving them pending
    pub auto_activate: bool,
}

/// Initial administrator created on first start
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_email: String,
    pub admin_full_name: String,
    /// Generated and logged once when absent
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            issuer: "identity-core".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            reset_token_ttl_minutes: 60,
            max_sessions_per_user: 10,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@localhost.localdomain".to_string(),
            admin_full_name: "Administrator".to_string(),
            admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
