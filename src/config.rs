use std::{
    env,
    fmt::{self, Display},
    net::SocketAddr,
    str::FromStr,
    sync::Arc,
};

use log::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub address: SocketAddr,
    pub jwt_secret: Arc<str>,
    pub max_connections: u32,
}

#[derive(Debug)]
pub struct ConfigError {
    key: String,
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration {}: {}", self.key, self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            address: try_load(&lookup, "FOODGRAM_ADDR", "0.0.0.0:8000")?,
            jwt_secret: required(&lookup, "FOODGRAM_JWT_SECRET")?.into(),
            max_connections: try_load(&lookup, "FOODGRAM_DB_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError {
            key: key.to_owned(),
            info: "environment variable is not set".to_owned(),
        })
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_owned()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ConfigError {
                key: key.to_owned(),
                info: format!("{e}"),
            }
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("FOODGRAM_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.address, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 5);
        assert_eq!(&*config.jwt_secret, "secret");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let error = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/foodgram")]))
            .unwrap_err();

        assert_eq!(error.key, "FOODGRAM_JWT_SECRET");
    }

    #[test]
    fn malformed_values_are_errors() {
        let error = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("FOODGRAM_JWT_SECRET", "secret"),
            ("FOODGRAM_DB_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();

        assert_eq!(error.key, "FOODGRAM_DB_MAX_CONNECTIONS");
    }
}
