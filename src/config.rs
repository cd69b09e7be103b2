use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub lending_api_url: String,
    pub cache_backend: CacheBackend,
    pub position_cache_ttl_minutes: u32,
    pub lp_price_cache_ttl_minutes: u32,
    pub background_refresh_delay_ms: u64,
    pub http_max_retry_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Entries persisted in the SQLite database.
    Sqlite,
    /// Entries kept in process memory only.
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or_default::<u16>(&env_map, "PORT", 8080, "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let lending_api_url = env_map
            .get("LENDING_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("LENDING_API_URL".to_string()))?;
        if !lending_api_url.starts_with("http://") && !lending_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "LENDING_API_URL".to_string(),
                "must be an http(s) URL".to_string(),
            ));
        }

        let cache_backend = match env_map
            .get("CACHE_BACKEND")
            .map(|s| s.as_str())
            .unwrap_or("sqlite")
        {
            "sqlite" => CacheBackend::Sqlite,
            "memory" => CacheBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CACHE_BACKEND".to_string(),
                    format!("must be sqlite or memory, got {}", other),
                ))
            }
        };

        let position_cache_ttl_minutes = parse_or_default::<u32>(
            &env_map,
            "POSITION_CACHE_TTL_MINUTES",
            5,
            "must be a whole number of minutes",
        )?;
        let lp_price_cache_ttl_minutes = parse_or_default::<u32>(
            &env_map,
            "LP_PRICE_CACHE_TTL_MINUTES",
            15,
            "must be a whole number of minutes",
        )?;
        let background_refresh_delay_ms = parse_or_default::<u64>(
            &env_map,
            "BACKGROUND_REFRESH_DELAY_MS",
            300,
            "must be a whole number of milliseconds",
        )?;
        let http_max_retry_secs = parse_or_default::<u64>(
            &env_map,
            "HTTP_MAX_RETRY_SECS",
            30,
            "must be a whole number of seconds",
        )?;

        Ok(Config {
            port,
            database_path,
            lending_api_url,
            cache_backend,
            position_cache_ttl_minutes,
            lp_price_cache_ttl_minutes,
            background_refresh_delay_ms,
            http_max_retry_secs,
        })
    }
}

fn parse_or_default<T: FromStr>(
    env_map: &HashMap<String, String>,
    name: &str,
    default: T,
    reason: &str,
) -> Result<T, ConfigError> {
    match env_map.get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), reason.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/lendfolio.db".to_string());
        map.insert(
            "LENDING_API_URL".to_string(),
            "https://api.example.invalid".to_string(),
        );
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_backend, CacheBackend::Sqlite);
        assert_eq!(config.position_cache_ttl_minutes, 5);
        assert_eq!(config.lp_price_cache_ttl_minutes, 15);
        assert_eq!(config.background_refresh_delay_ms, 300);
        assert_eq!(config.http_max_retry_secs, 30);
    }

    #[test]
    fn test_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "9000".to_string());
        env_map.insert("CACHE_BACKEND".to_string(), "memory".to_string());
        env_map.insert("POSITION_CACHE_TTL_MINUTES".to_string(), " 1 ".to_string());
        env_map.insert("BACKGROUND_REFRESH_DELAY_MS".to_string(), "0".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.position_cache_ttl_minutes, 1);
        assert_eq!(config.background_refresh_delay_ms, 0);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_lending_api_url() {
        let mut env_map = setup_required_env();
        env_map.remove("LENDING_API_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "LENDING_API_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_non_http_api_url() {
        let mut env_map = setup_required_env();
        env_map.insert("LENDING_API_URL".to_string(), "ftp://x".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LENDING_API_URL"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_cache_backend() {
        let mut env_map = setup_required_env();
        env_map.insert("CACHE_BACKEND".to_string(), "redis".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CACHE_BACKEND"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_ttl() {
        let mut env_map = setup_required_env();
        env_map.insert("LP_PRICE_CACHE_TTL_MINUTES".to_string(), "-5".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LP_PRICE_CACHE_TTL_MINUTES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
