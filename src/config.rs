use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub events: EventConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the user summary cache used by the comment feed
    pub user_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/forum.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
            cache: CacheConfig {
                user_capacity: env::var("USER_CACHE_CAPACITY")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
            },
            events: EventConfig {
                channel_capacity: env::var("EVENT_CHANNEL_CAPACITY")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()
                    .unwrap_or(256),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pool, cache and channel constructors cannot accept
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if self.cache.user_capacity == 0 {
            anyhow::bail!("USER_CACHE_CAPACITY must be at least 1");
        }
        if self.events.channel_capacity == 0 {
            anyhow::bail!("EVENT_CHANNEL_CAPACITY must be at least 1");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8081,
            },
            cache: CacheConfig { user_capacity: 16 },
            events: EventConfig { channel_capacity: 8 },
        }
    }

    #[test]
    fn test_server_address() {
        assert_eq!(sample().server_address(), "127.0.0.1:8081");
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = sample();
        assert!(config.validate().is_ok());

        config.cache.user_capacity = 0;
        assert!(config.validate().is_err());
    }
}
