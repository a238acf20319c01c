// config.rs
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AppError, Result};

const DEV_JWT_SECRET: &str = "your-secret-key";

const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3001",
    "http://localhost:3000",
    "https://aishegasckk.in",
    "https://www.aishegasckk.in",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl: bool,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    /// Create minimal user tables at startup when they are missing.
    pub bootstrap_user_tables: bool,
}

/// Outbound mail account. Present only when both credentials are set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub mail: Option<MailConfig>,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_name(
            &env::var("APP_ENV")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_default(),
        );

        if environment != Environment::Production {
            dotenvy::dotenv().ok();
        }

        let database = DatabaseConfig {
            host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: parse_var("DB_PORT", 3306)?,
            user: env::var("DB_USER").unwrap_or_else(|_| "root".to_string()),
            password: env::var("DB_PASS").unwrap_or_default(),
            name: env::var("DB_NAME").unwrap_or_else(|_| "portal".to_string()),
            ssl: parse_flag("DB_SSL"),
            pool_size: parse_var("DB_POOL_SIZE", 10)?,
            connect_timeout: Duration::from_secs(parse_var("DB_CONNECT_TIMEOUT_SECS", 60)?),
            bootstrap_user_tables: parse_flag("DB_BOOTSTRAP_USER_TABLES"),
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == Environment::Production => {
                return Err(AppError::configuration("JWT_SECRET must be set in production"));
            }
            _ => {
                tracing::warn!("JWT_SECRET not set, using development fallback");
                DEV_JWT_SECRET.to_string()
            }
        };

        let mail = match (env::var("EMAIL_USER"), env::var("EMAIL_PASS")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(MailConfig {
                    smtp_host: env::var("SMTP_HOST")
                        .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                    smtp_port: parse_var("SMTP_PORT", 587)?,
                    username,
                    password,
                    from_name: env::var("MAIL_FROM_NAME")
                        .unwrap_or_else(|_| "GASCKK AISHE PORTAL".to_string()),
                })
            }
            _ => None,
        };

        let cors_origins = match env::var("CORS_ORIGIN") {
            Ok(list) if !list.trim().is_empty() => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            _ => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(AppConfig {
            environment,
            database,
            jwt_secret,
            mail,
            cors_origins,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 5000)?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn mail_configured(&self) -> bool {
        self.mail.is_some()
    }

    /// Loggable summary. Secrets are reported only as set/unset.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.environment.as_str(),
            "db_host": self.database.host,
            "db_port": self.database.port,
            "db_user": self.database.user,
            "db_name": self.database.name,
            "db_ssl": self.database.ssl,
            "db_pool_size": self.database.pool_size,
            "db_bootstrap_user_tables": self.database.bootstrap_user_tables,
            "mail_configured": self.mail_configured(),
            "cors_origins": self.cors_origins,
            "port": self.port,
        })
    }
}

impl Default for AppConfig {
    /// Development settings with no mail account; used by tests and tooling.
    fn default() -> Self {
        AppConfig {
            environment: Environment::Development,
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 3306,
                user: "root".to_string(),
                password: String::new(),
                name: "portal".to_string(),
                ssl: false,
                pool_size: 10,
                connect_timeout: Duration::from_secs(60),
                bootstrap_user_tables: false,
            },
            jwt_secret: DEV_JWT_SECRET.to_string(),
            mail: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a number, got {:?}", name, raw))),
        _ => Ok(default),
    }
}

/// Only the literal `true` turns a flag on.
fn parse_flag(name: &str) -> bool {
    env::var(name).map(|v| v.trim() == "true").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_defaults_to_development() {
        assert_eq!(Environment::from_name(""), Environment::Development);
        assert_eq!(Environment::from_name("staging"), Environment::Development);
        assert_eq!(Environment::from_name("Production"), Environment::Production);
    }

    #[test]
    fn default_config_has_no_mail() {
        let config = AppConfig::default();
        assert!(!config.mail_configured());
        assert!(!config.is_production());
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.cors_origins.len(), 4);
        assert!(!config.database.bootstrap_user_tables);
    }

    #[test]
    fn flags_need_literal_true() {
        env::set_var("PORTAL_TEST_FLAG_ON", "true");
        env::set_var("PORTAL_TEST_FLAG_YES", "yes");
        assert!(parse_flag("PORTAL_TEST_FLAG_ON"));
        assert!(!parse_flag("PORTAL_TEST_FLAG_YES"));
        assert!(!parse_flag("PORTAL_TEST_FLAG_UNSET"));
    }
}
