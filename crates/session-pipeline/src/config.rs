// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;

use crate::errors::ConfigError;

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_SKY_URL: &str = "http://localhost:8585";
const DEFAULT_TABLE: &str = "visits";

/// Startup configuration for the relay, built once from the environment and
/// passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// File to follow.
    pub source_file: PathBuf,
    /// External "tail from start, keep following" helper to invoke.
    pub tail_helper: PathBuf,
    /// Hand-off queue capacity; the backpressure threshold.
    pub queue_capacity: usize,
    /// Event store endpoint.
    pub sky_url: String,
    /// Table receiving session events.
    pub table_name: String,
    /// Log level (e.g. trace, debug, info, warn, error).
    pub log_level: String,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source_file = env::var("RELAY_SOURCE_FILE")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingEnv("RELAY_SOURCE_FILE"))?;
        let tail_helper = env::var("RELAY_TAIL_HELPER")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingEnv("RELAY_TAIL_HELPER"))?;

        let queue_capacity = match env::var("RELAY_QUEUE_CAPACITY") {
            Ok(value) => value
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "RELAY_QUEUE_CAPACITY",
                    value,
                })?,
            Err(_) => DEFAULT_QUEUE_CAPACITY,
        };

        let sky_url = env::var("RELAY_SKY_URL").unwrap_or_else(|_| DEFAULT_SKY_URL.to_string());
        let table_name = env::var("RELAY_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string());
        let log_level = env::var("RELAY_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());

        let config = RelayConfig {
            source_file,
            tail_helper,
            queue_capacity,
            sky_url,
            table_name,
            log_level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RELAY_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }
        if self.table_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "RELAY_TABLE",
                value: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "RELAY_SOURCE_FILE",
            "RELAY_TAIL_HELPER",
            "RELAY_QUEUE_CAPACITY",
            "RELAY_SKY_URL",
            "RELAY_TABLE",
            "RELAY_LOG_LEVEL",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_error_if_source_file_not_set() {
        clear_env();
        let config = RelayConfig::from_env();
        assert!(config.is_err());
        assert_eq!(
            config.unwrap_err().to_string(),
            "RELAY_SOURCE_FILE environment variable is not set"
        );
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        env::set_var("RELAY_SOURCE_FILE", "/var/log/access.json.log");
        env::set_var("RELAY_TAIL_HELPER", "/usr/local/sbin/tail_from_start.sh");
        let config = RelayConfig::from_env().expect("config should build");
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.sky_url, "http://localhost:8585");
        assert_eq!(config.table_name, "visits");
        assert_eq!(config.log_level, "info");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_custom_values() {
        clear_env();
        env::set_var("RELAY_SOURCE_FILE", "/tmp/a.log");
        env::set_var("RELAY_TAIL_HELPER", "/tmp/tail.sh");
        env::set_var("RELAY_QUEUE_CAPACITY", "64");
        env::set_var("RELAY_SKY_URL", "http://sky.internal:8585/");
        env::set_var("RELAY_TABLE", "sessions");
        env::set_var("RELAY_LOG_LEVEL", "DEBUG");
        let config = RelayConfig::from_env().expect("config should build");
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.sky_url, "http://sky.internal:8585/");
        assert_eq!(config.table_name, "sessions");
        assert_eq!(config.log_level, "debug");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_queue_capacity() {
        clear_env();
        env::set_var("RELAY_SOURCE_FILE", "/tmp/a.log");
        env::set_var("RELAY_TAIL_HELPER", "/tmp/tail.sh");
        env::set_var("RELAY_QUEUE_CAPACITY", "not-a-number");
        let config = RelayConfig::from_env();
        assert!(config.is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_queue_capacity_rejected() {
        clear_env();
        env::set_var("RELAY_SOURCE_FILE", "/tmp/a.log");
        env::set_var("RELAY_TAIL_HELPER", "/tmp/tail.sh");
        env::set_var("RELAY_QUEUE_CAPACITY", "0");
        let config = RelayConfig::from_env();
        assert!(config.is_err());
        clear_env();
    }
}
