//! HTTP surface configuration parsing from environment variables.

use super::env_or;
use std::env;

#[derive(Debug, Clone)]
pub struct ServerEnvConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerEnvConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerEnvConfig {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("HTTP_BIND_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("HTTP_PORT", 8080),
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerEnvConfig::default();
        assert_eq!(config.socket_addr(), "127.0.0.1:8080");
    }
}
