// config.rs
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token and cookie lifetime, in minutes.
    pub jwt_maxage: i64,
    pub port: u16,
    pub db_max_connections: u32,
    pub media_root: String,
    pub media_base_url: String,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;

        let jwt_maxage = lookup("JWT_MAXAGE")
            .unwrap_or_else(|| "60".to_string())
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid("JWT_MAXAGE", e.to_string()))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?;

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| ConfigError::Invalid("DB_MAX_CONNECTIONS", e.to_string()))?;

        let media_root = lookup("MEDIA_ROOT").unwrap_or_else(|| "./media".to_string());
        let media_base_url = lookup("MEDIA_BASE_URL").unwrap_or_else(|| "/media".to_string());

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let log_level = lookup("RUST_LOG_LEVEL").unwrap_or_else(|| "debug".to_string());

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_maxage,
            port,
            db_max_connections,
            media_root,
            media_base_url,
            allowed_origins,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/makazi"),
            ("JWT_SECRET_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_maxage, 60);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET_KEY", "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/makazi"),
            ("JWT_SECRET_KEY", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT", _)));
    }
}
