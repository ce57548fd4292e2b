use serde::Deserialize;

/// Default access token lifetime: 1 hour
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 3600;
/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 604_800;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub jwt: JwtSettings,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the individual fields.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database_name
            ),
        }
    }
}

/// JWT signing settings
///
/// Secrets are optional here so a missing value can be reported as a
/// proper configuration error by `JwtKeys::from_settings` instead of a
/// deserialization failure.
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    #[serde(default)]
    pub access_secret: Option<String>,
    /// Falls back to `access_secret` when unset.
    #[serde(default)]
    pub refresh_secret: Option<String>,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry: i64, // seconds
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            access_secret: None,
            refresh_secret: None,
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
            issuer: default_issuer(),
        }
    }
}

impl JwtSettings {
    /// Settings with a single shared secret and default lifetimes.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            access_secret: Some(secret.into()),
            ..Self::default()
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_db_port() -> u16 {
    5432
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    2
}

fn default_access_expiry() -> i64 {
    DEFAULT_ACCESS_TOKEN_EXPIRY
}

fn default_refresh_expiry() -> i64 {
    DEFAULT_REFRESH_TOKEN_EXPIRY
}

fn default_issuer() -> String {
    "dashboard".to_string()
}

/// Load settings from `configuration.*`, then `APP_*` environment
/// variables (`APP_JWT__ACCESS_SECRET`), then the conventional
/// `JWT_SECRET`, `JWT_REFRESH_SECRET` and `DATABASE_URL` variables.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("jwt.access_secret", std::env::var("JWT_SECRET").ok())?
        .set_override_option("jwt.refresh_secret", std::env::var("JWT_REFRESH_SECRET").ok())?
        .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
        .build()?;
    settings.try_deserialize::<Settings>()
}
