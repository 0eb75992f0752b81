use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

/// Which persistence backend the service runs against.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret, at least 32 bytes.
    pub secret: Secret<String>,
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

pub const MIN_JWT_SECRET_BYTES: usize = 32;
pub const MAX_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 365;

impl TaskConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let store: StoreBackend = get_env("STORE_BACKEND", Some("postgres"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database_url = match store {
            StoreBackend::Postgres => get_env("DATABASE_URL", None, is_prod)?,
            StoreBackend::Memory => env::var("DATABASE_URL").unwrap_or_default(),
        };

        let config = TaskConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("task-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", false)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", false)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None, is_prod)?),
                issuer: get_env("JWT_ISSUER", Some("task-service"), is_prod)?,
                audience: get_env("JWT_AUDIENCE", Some("task-client"), is_prod)?,
                access_token_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    "15",
                    false,
                )?,
                refresh_token_expiry_days: parse_env("JWT_REFRESH_TOKEN_EXPIRY_DAYS", "7", false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", "5", false)?,
                login_window_seconds: parse_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900", false)?,
                register_attempts: parse_env("RATE_LIMIT_REGISTER_ATTEMPTS", "3", false)?,
                register_window_seconds: parse_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    "3600",
                    false,
                )?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", "100", false)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    false,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }

        if !(1..=MAX_ACCESS_TOKEN_EXPIRY_MINUTES).contains(&self.jwt.access_token_expiry_minutes) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be between 1 and {}",
                MAX_ACCESS_TOKEN_EXPIRY_MINUTES
            )));
        }

        if !(1..=MAX_REFRESH_TOKEN_EXPIRY_DAYS).contains(&self.jwt.refresh_token_expiry_days) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be between 1 and {}",
                MAX_REFRESH_TOKEN_EXPIRY_DAYS
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.store == StoreBackend::Memory {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "STORE_BACKEND=memory is not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TaskConfig {
        TaskConfig {
            common: core_config::Config { port: 8080 },
            environment: Environment::Dev,
            service_name: "task-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            store: StoreBackend::Memory,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: Secret::new("0123456789abcdef0123456789abcdef".to_string()),
                issuer: "task-service".to_string(),
                audience: "task-client".to_string(),
                access_token_expiry_minutes: 15,
                refresh_token_expiry_days: 7,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 5,
                login_window_seconds: 900,
                register_attempts: 3,
                register_window_seconds: 3600,
                global_ip_limit: 100,
                global_ip_window_seconds: 60,
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = sample_config();
        config.jwt.secret = Secret::new("too-short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_expiry_bounds() {
        let mut config = sample_config();
        config.jwt.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES;
        config.jwt.refresh_token_expiry_days = MAX_REFRESH_TOKEN_EXPIRY_DAYS;
        assert!(config.validate().is_ok());

        config.jwt.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES + 1;
        assert!(config.validate().is_err());

        config.jwt.access_token_expiry_minutes = 15;
        config.jwt.refresh_token_expiry_days = i64::MAX;
        assert!(config.validate().is_err());

        config.jwt.refresh_token_expiry_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_store_rejected_in_prod() {
        let mut config = sample_config();
        config.environment = Environment::Prod;
        assert!(config.validate().is_err());

        config.store = StoreBackend::Postgres;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_origin_rejected_in_prod() {
        let mut config = sample_config();
        config.environment = Environment::Prod;
        config.store = StoreBackend::Postgres;
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_store_backend() {
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
