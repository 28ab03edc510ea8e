use std::env;

use thiserror::Error;

/// Fallback signing secret used when `JWT_SECRET` is unset outside production.
pub const LOCAL_JWT_SECRET: &str = "local-development-jwt-secret";

/// Fallback connection string used when `MONGODB_URI` is unset outside production.
pub const LOCAL_MONGODB_URI: &str = "mongodb://localhost:27017";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// ConfigError
///
/// Raised by `AppConfig::load` when a variable that is mandatory for the
/// current runtime environment is missing.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
}

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through `AppState`.
/// Handlers and extractors pull it out of the state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls fail-fast behaviour and log format.
    pub env: Env,
    // MongoDB connection string.
    pub mongodb_uri: String,
    // Explicit database name. When unset the URI's default database is used.
    pub mongodb_db: Option<String>,
    // Shared HS256 secret used to validate incoming JWTs.
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Runtime context. `Local` tolerates missing secrets and logs in a human
/// readable format; `Production` demands every secret and logs JSON.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for test state scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            mongodb_uri: LOCAL_MONGODB_URI.to_string(),
            mongodb_db: Some("website_registry_test".to_string()),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. In production the
    /// database URI and the JWT secret are mandatory, and a missing one is
    /// reported instead of silently falling back to a development value.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = required_in_production(&env, "JWT_SECRET", LOCAL_JWT_SECRET)?;
        let mongodb_uri = required_in_production(&env, "MONGODB_URI", LOCAL_MONGODB_URI)?;

        let mongodb_db = env::var("MONGODB_DB").ok().filter(|name| !name.is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            env,
            mongodb_uri,
            mongodb_db,
            jwt_secret,
            bind_addr,
        })
    }
}

fn required_in_production(
    env: &Env,
    key: &'static str,
    local_fallback: &str,
) -> Result<String, ConfigError> {
    match (env, env::var(key)) {
        (_, Ok(value)) if !value.is_empty() => Ok(value),
        (Env::Production, _) => Err(ConfigError::Missing(key)),
        (Env::Local, _) => Ok(local_fallback.to_string()),
    }
}
