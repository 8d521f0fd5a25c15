use config::ConfigError;

use crate::auth::MIN_SECRET_LENGTH;
use crate::error::AppError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    /// Absent: revocations are kept in process memory
    pub redis: Option<RedisSettings>,
    /// Absent: users come from an in-memory store seeded with the admin account
    pub database: Option<DatabaseSettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub seed_default_admin: bool,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct RedisSettings {
    pub url: String,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl RedisSettings {
    pub fn operation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT signing settings
///
/// The refresh token lifetime is not configurable: it is always twice
/// the access token lifetime.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64, // seconds (e.g., 3600 for 1 hour)
}

impl JwtSettings {
    /// Reject settings no token could be safely issued with
    ///
    /// # Errors
    /// `ConfigurationFatal` for a short/empty secret or a non-positive expiry
    pub fn validate(&self) -> Result<(), AppError> {
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::ConfigurationFatal(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_token_expiry <= 0 {
            return Err(AppError::ConfigurationFatal(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_expiry)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_operation_timeout_ms() -> u64 {
    500
}

/// Load settings from `configuration.{yaml,toml,json}` (optional) and
/// `APP__SECTION__KEY` environment variables, the latter taking precedence.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str, expiry: i64) -> JwtSettings {
        JwtSettings {
            secret: secret.to_string(),
            access_token_expiry: expiry,
        }
    }

    #[test]
    fn test_valid_jwt_settings() {
        let settings = jwt("test-secret-key-at-least-32-characters-long", 3600);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.access_token_ttl(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_short_or_empty_secret_is_fatal() {
        for secret in ["", "short"] {
            let err = jwt(secret, 3600).validate().unwrap_err();
            assert!(matches!(err, AppError::ConfigurationFatal(_)));
        }
    }

    #[test]
    fn test_non_positive_expiry_is_fatal() {
        let err = jwt("test-secret-key-at-least-32-characters-long", 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigurationFatal(_)));
    }

    #[test]
    fn test_settings_deserialize_with_optional_backends() {
        let settings: Settings = config::Config::builder()
            .set_override("application.port", 8080)
            .unwrap()
            .set_override("jwt.secret", "test-secret-key-at-least-32-characters-long")
            .unwrap()
            .set_override("jwt.access_token_expiry", 3600)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.application.address(), "127.0.0.1:8080");
        assert!(settings.application.seed_default_admin);
        assert!(settings.redis.is_none());
        assert!(settings.database.is_none());
    }
}
