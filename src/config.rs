// Runtime configuration
//
// Read once at startup from the environment (and `.env` via dotenv). Unset
// variables fall back to defaults silently; unparsable ones are logged.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::agents::delegation::DEFAULT_MIN_REMAINDER_LEN;
use crate::agents::events::DEFAULT_EVENT_BUFFER;
use crate::agents::remote::DEFAULT_EXECUTION_TIMEOUT;
use crate::domain::agent::DEFAULT_OUTPUT_CAPACITY;
use crate::infrastructure::repositories::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3847";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Session backend base URL; `None` runs on the simulator only
    pub backend_url: Option<String>,
    pub execution_timeout: Duration,
    pub output_capacity: usize,
    pub queue_history: usize,
    pub event_buffer: usize,
    pub min_remainder_len: usize,
    pub max_delegation_depth: u32,
    pub error_reset: Duration,
    pub connect_retries: u32,
    pub retry_delay: Duration,
    pub simulator_instant: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3847)),
            backend_url: None,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            queue_history: DEFAULT_HISTORY_LIMIT,
            event_buffer: DEFAULT_EVENT_BUFFER,
            min_remainder_len: DEFAULT_MIN_REMAINDER_LEN,
            max_delegation_depth: 3,
            error_reset: Duration::from_millis(3000),
            connect_retries: 2,
            retry_delay: Duration::from_millis(2000),
            simulator_instant: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; used by `from_env` and tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(&lookup, key, default.as_millis() as u64))
        };

        let backend_url = lookup("SQUAD_BACKEND_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if backend_url.is_none() {
            tracing::warn!("SQUAD_BACKEND_URL not set, commands will use the local simulator");
        }

        Self {
            bind_addr: parse_or(&lookup, "SQUAD_BIND_ADDR", defaults.bind_addr),
            backend_url,
            execution_timeout: millis("SQUAD_EXECUTION_TIMEOUT_MS", defaults.execution_timeout),
            output_capacity: parse_or(&lookup, "SQUAD_OUTPUT_CAPACITY", defaults.output_capacity),
            queue_history: parse_or(&lookup, "SQUAD_QUEUE_HISTORY", defaults.queue_history),
            event_buffer: parse_or(&lookup, "SQUAD_EVENT_BUFFER", defaults.event_buffer),
            min_remainder_len: parse_or(&lookup, "SQUAD_MIN_REMAINDER", defaults.min_remainder_len),
            max_delegation_depth: parse_or(
                &lookup,
                "SQUAD_MAX_DELEGATION_DEPTH",
                defaults.max_delegation_depth,
            ),
            error_reset: millis("SQUAD_ERROR_RESET_MS", defaults.error_reset),
            connect_retries: parse_or(&lookup, "SQUAD_CONNECT_RETRIES", defaults.connect_retries),
            retry_delay: millis("SQUAD_RETRY_DELAY_MS", defaults.retry_delay),
            simulator_instant: parse_or(&lookup, "SQUAD_SIMULATOR_INSTANT", defaults.simulator_instant),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = config_from(&[]);

        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(config.backend_url.is_none());
        assert_eq!(config.execution_timeout, Duration::from_millis(300_000));
        assert_eq!(config.output_capacity, 100);
        assert_eq!(config.queue_history, 500);
        assert_eq!(config.max_delegation_depth, 3);
        assert!(!config.simulator_instant);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("SQUAD_BIND_ADDR", "127.0.0.1:9000"),
            ("SQUAD_BACKEND_URL", "http://localhost:4000"),
            ("SQUAD_EXECUTION_TIMEOUT_MS", "1500"),
            ("SQUAD_SIMULATOR_INSTANT", "true"),
        ]);

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.backend_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.execution_timeout, Duration::from_millis(1500));
        assert!(config.simulator_instant);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("SQUAD_OUTPUT_CAPACITY", "lots"),
            ("SQUAD_BACKEND_URL", "  "),
        ]);

        assert_eq!(config.output_capacity, 100);
        assert!(config.backend_url.is_none());
    }
}
