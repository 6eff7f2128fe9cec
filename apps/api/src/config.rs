// Application configuration
// Read from the environment (and `.env` in development) at startup

use chrono::{Duration, NaiveTime};
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::domain::brief::deadlines::{parse_interval, MAX_OPEN_DAYS};
use crate::domain::brief::DeadlineRules;
use crate::services::ServiceSettings;

const DEFAULT_JWT_SECRET: &str = "dev-secret-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Top-level configuration for the service
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub log_level: String,
    pub settings: ServiceSettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub password_cost: u32,
}

impl AppConfig {
    /// Loads configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?;

        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "APP_PORT", 3000)?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            DEFAULT_JWT_SECRET.to_string()
        });
        let password_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;

        let mut deadlines = DeadlineRules::default();
        if let Some(value) = lookup("DEADLINES_TIME_OF_DAY") {
            deadlines.time_of_day = NaiveTime::parse_from_str(&value, "%H:%M:%S")
                .map_err(|_| invalid("DEADLINES_TIME_OF_DAY", &value))?;
        }
        if let Some(value) = lookup("DEFAULT_REQUIREMENTS_DURATION") {
            let usable = parse_interval(&value).map_or(false, |d| d <= Duration::days(MAX_OPEN_DAYS));
            if !usable {
                return Err(invalid("DEFAULT_REQUIREMENTS_DURATION", &value));
            }
            deadlines.default_requirements_length = value;
        }

        let claim_max_age = match lookup("CLAIM_MAX_AGE_SECONDS") {
            None => ServiceSettings::default().claim_max_age,
            Some(value) => {
                let seconds: i64 = value
                    .parse()
                    .map_err(|_| invalid("CLAIM_MAX_AGE_SECONDS", &value))?;
                if seconds > 0 {
                    let age = Duration::try_seconds(seconds)
                        .ok_or_else(|| invalid("CLAIM_MAX_AGE_SECONDS", &value))?;
                    Some(age)
                } else {
                    None
                }
            }
        };

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                password_cost,
            },
            log_level: lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            settings: ServiceSettings {
                deadlines,
                claim_max_age,
            },
        })
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| invalid("APP_HOST", &self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| invalid(name, &value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/marketplace")]).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.settings.claim_max_age, Some(Duration::days(7)));
        assert_eq!(
            config.settings.deadlines.time_of_day,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap()
        );
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://db/marketplace"),
            ("APP_PORT", "8080"),
            ("DEADLINES_TIME_OF_DAY", "23:59:59"),
            ("DEFAULT_REQUIREMENTS_DURATION", "1 week"),
            ("CLAIM_MAX_AGE_SECONDS", "0"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.settings.deadlines.default_requirements_length, "1 week");
        assert_eq!(
            config.settings.deadlines.time_of_day,
            NaiveTime::from_hms_opt(23, 59, 59).unwrap()
        );
        assert_eq!(config.settings.claim_max_age, None);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = config(&[("DATABASE_URL", "x"), ("APP_PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "APP_PORT has an invalid value 'eighty'");

        let err = config(&[("DATABASE_URL", "x"), ("DEADLINES_TIME_OF_DAY", "6pm")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DEADLINES_TIME_OF_DAY", .. }));
    }

    #[test]
    fn requirements_duration_must_be_an_interval() {
        for value in ["fortnight", "2 months", "0 weeks", "60 weeks", "99999999999 days"] {
            let err = config(&[("DATABASE_URL", "x"), ("DEFAULT_REQUIREMENTS_DURATION", value)])
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "DEFAULT_REQUIREMENTS_DURATION", .. }),
                "{value} should be refused"
            );
        }

        let config = config(&[("DATABASE_URL", "x"), ("DEFAULT_REQUIREMENTS_DURATION", "10 days")])
            .unwrap();
        assert_eq!(config.settings.deadlines.default_requirements_length, "10 days");
    }

    #[test]
    fn oversized_claim_age_is_an_error() {
        let err = config(&[
            ("DATABASE_URL", "x"),
            ("CLAIM_MAX_AGE_SECONDS", "9223372036854775807"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CLAIM_MAX_AGE_SECONDS", .. }));

        let config = config(&[("DATABASE_URL", "x"), ("CLAIM_MAX_AGE_SECONDS", "3600")]).unwrap();
        assert_eq!(config.settings.claim_max_age, Some(Duration::hours(1)));
    }

    #[test]
    fn localhost_binds_loopback() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 3000,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }
}
