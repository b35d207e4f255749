//! Configuration module for cryptopulse.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Upstream, Cache and Server.

mod cache_config;
mod server_config;
mod upstream_config;

pub use cache_config::CacheEnvConfig;
pub use server_config::ServerEnvConfig;
pub use upstream_config::UpstreamEnvConfig;

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Where market data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Mock,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(Mode::Live),
            "mock" => Ok(Mode::Mock),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'live' or 'mock'", s),
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub upstream: UpstreamEnvConfig,
    pub cache: CacheEnvConfig,
    pub server: ServerEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mode_str = env::var("MODE").unwrap_or_else(|_| "live".to_string());
        let mode = Mode::from_str(&mode_str)?;

        let upstream = UpstreamEnvConfig::from_env();
        let cache = CacheEnvConfig::from_env().context("Failed to load cache config")?;
        let server = ServerEnvConfig::from_env();

        Ok(Self {
            mode,
            upstream,
            cache,
            server,
        })
    }
}
