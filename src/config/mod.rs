use ::config::ConfigError;
use serde::Deserialize;
use std::env;

// Top-level configuration, grouped by concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Without a URL the service runs on the in-memory store
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
    pub bootstrap_admin_username: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

/// Environment variable -> configuration key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("HOST", "app.host"),
    ("PORT", "app.port"),
    ("ENVIRONMENT", "app.environment"),
    ("RUST_LOG", "app.rust_log"),
    ("DATABASE_URL", "database.url"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("DB_ACQUIRE_TIMEOUT_SECS", "database.acquire_timeout_secs"),
    ("DB_RUN_MIGRATIONS", "database.run_migrations"),
    ("JWT_SECRET", "jwt.secret"),
    ("JWT_EXPIRES_IN_MINUTES", "jwt.expires_in_minutes"),
    ("BCRYPT_COST", "auth.bcrypt_cost"),
    ("BOOTSTRAP_ADMIN_USERNAME", "auth.bootstrap_admin_username"),
    ("BOOTSTRAP_ADMIN_PASSWORD", "auth.bootstrap_admin_password"),
];

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from defaults overridden by whatever `lookup`
    /// returns for each variable in [`ENV_KEYS`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000_i64)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "cinema_booking=debug,tower_http=debug")?
            .set_default("database.pool_size", 20_i64)?
            .set_default("database.acquire_timeout_secs", 5_i64)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.expires_in_minutes", 30_i64)?
            .set_default("auth.bcrypt_cost", 12_i64)?;

        for (var, key) in ENV_KEYS {
            let value = lookup(var).filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app.environment.eq_ignore_ascii_case("production")
    }
}
