//! Configuration module for environment variable parsing.
//!
//! All tunables are resolved once at startup and injected into the
//! components that need them; nothing reads ambient process state later.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Account identifier prefixed to the queue path
    pub account_id: String,

    /// Name of the inbound message queue
    pub queue_name: String,

    /// How long a received message stays invisible before re-surfacing.
    /// Must exceed the handler's worst-case execution time.
    pub visibility_timeout: Duration,

    /// Delivery attempts before a message is dead-lettered (always finite)
    pub max_receive_count: u32,

    /// Maximum messages handed to the handler per delivery attempt
    pub receive_batch_size: usize,

    /// Number of concurrent consumer pollers
    pub consumer_concurrency: usize,

    /// Idle sleep between empty polls
    pub poll_interval: Duration,

    /// Upper bound on one handler invocation
    pub handler_timeout: Duration,

    /// At-rest encryption key (hex in the environment). When unset the
    /// queue generates a per-process managed key.
    pub encryption_key: Option<Vec<u8>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            account_id: "000000000000".to_string(),
            queue_name: "inbound-messages".to_string(),
            visibility_timeout: Duration::from_secs(910),
            max_receive_count: 5,
            receive_batch_size: 10,
            consumer_concurrency: 2,
            poll_interval: Duration::from_millis(250),
            handler_timeout: Duration::from_secs(900),
            encryption_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let mut config = Config {
            port: parse_env("PORT", defaults.port),

            account_id: env::var("ACCOUNT_ID").unwrap_or(defaults.account_id),

            queue_name: env::var("QUEUE_NAME").unwrap_or(defaults.queue_name),

            visibility_timeout: Duration::from_secs(parse_env(
                "VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout.as_secs(),
            )),

            max_receive_count: parse_env("MAX_RECEIVE_COUNT", defaults.max_receive_count),

            receive_batch_size: parse_env("RECEIVE_BATCH_SIZE", defaults.receive_batch_size),

            consumer_concurrency: parse_env("CONSUMER_CONCURRENCY", defaults.consumer_concurrency),

            poll_interval: Duration::from_millis(parse_env(
                "POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),

            handler_timeout: Duration::from_secs(parse_env(
                "HANDLER_TIMEOUT_SECS",
                defaults.handler_timeout.as_secs(),
            )),

            encryption_key: parse_hex_key("ENCRYPTION_KEY"),
        };

        // The dead-letter cap must stay finite for poison messages to
        // terminate; zero would also suppress every delivery.
        if config.max_receive_count == 0 {
            warn!("MAX_RECEIVE_COUNT must be at least 1, using 1");
            config.max_receive_count = 1;
        }

        if config.receive_batch_size == 0 {
            warn!("RECEIVE_BATCH_SIZE must be at least 1, using 1");
            config.receive_batch_size = 1;
        }

        if config.consumer_concurrency == 0 {
            warn!("CONSUMER_CONCURRENCY must be at least 1, using 1");
            config.consumer_concurrency = 1;
        }

        config
    }

    /// Queue path the wire protocol addresses, `{account_id}/{queue_name}`.
    pub fn queue_path(&self) -> String {
        format!("{}/{}", self.account_id, self.queue_name)
    }
}

/// Parse an environment variable, falling back to a default on absence or
/// invalid values.
fn parse_env<T: FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a hex-encoded key from the environment.
fn parse_hex_key(name: &str) -> Option<Vec<u8>> {
    let raw = env::var(name).ok()?;
    match hex::decode(raw.trim()) {
        Ok(key) if !key.is_empty() => Some(key),
        Ok(_) => {
            warn!(env_var = name, "Empty key, using a managed key");
            None
        }
        Err(_) => {
            warn!(env_var = name, "Invalid hex key, using a managed key");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_valid() {
        env::set_var("TEST_PARSE_ENV", "42");
        let result: u32 = parse_env("TEST_PARSE_ENV", 7);
        assert_eq!(result, 42);
        env::remove_var("TEST_PARSE_ENV");
    }

    #[test]
    fn test_parse_env_invalid_uses_default() {
        env::set_var("TEST_PARSE_ENV_BAD", "not-a-number");
        let result: u32 = parse_env("TEST_PARSE_ENV_BAD", 7);
        assert_eq!(result, 7);
        env::remove_var("TEST_PARSE_ENV_BAD");
    }

    #[test]
    fn test_parse_env_missing_uses_default() {
        let result: u16 = parse_env("NONEXISTENT_VAR", 8080);
        assert_eq!(result, 8080);
    }

    #[test]
    fn test_parse_hex_key() {
        env::set_var("TEST_HEX_KEY", "deadbeef");
        assert_eq!(parse_hex_key("TEST_HEX_KEY"), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        env::remove_var("TEST_HEX_KEY");
    }

    #[test]
    fn test_parse_hex_key_invalid() {
        env::set_var("TEST_HEX_KEY_BAD", "zzzz");
        assert_eq!(parse_hex_key("TEST_HEX_KEY_BAD"), None);
        env::remove_var("TEST_HEX_KEY_BAD");
    }

    #[test]
    fn test_queue_path() {
        let config = Config::default();
        assert_eq!(config.queue_path(), "000000000000/inbound-messages");
    }

    #[test]
    fn test_visibility_exceeds_handler_timeout() {
        let config = Config::default();
        assert!(config.visibility_timeout > config.handler_timeout);
    }
}
