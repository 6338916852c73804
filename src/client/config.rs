//! Client configuration.
//!
//! Values come from [`ClientConfig::default`], the builder, or environment
//! variables:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `BOOKING_SERVER_ADDR` | server `host:port` | `localhost:3000` |
//! | `BOOKING_TIMEOUT_SECS` | per-attempt request timeout | 60 |
//! | `BOOKING_USE_ACK` | wait for `ACK` before the reply | true |
//! | `BOOKING_MAX_RETRIES` | retransmissions after the first attempt | 5 |
//! | `BOOKING_WATCH_MINUTES` | default watch duration | 10 |
//! | `BOOKING_ACK_TIMEOUT_SECS` | watch registration timeout | 5 |

use std::time::Duration;

use thiserror::Error;

use crate::core::constants::{
    DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_ADDR,
    DEFAULT_USE_ACK, DEFAULT_WATCH_DURATION,
};
use crate::transport::SendOptions;

use super::watch::WatchOptions;

/// Errors while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address (`host:port`).
    pub server_addr: String,

    /// Deadline for the send and the reply phase of each attempt.
    pub request_timeout: Duration,

    /// Wait for `ACK` before awaiting the reply.
    pub use_ack: bool,

    /// Retransmissions allowed after the first attempt.
    pub max_retries: u32,

    /// ACK-phase deadline for ordinary requests (`request_timeout / 3` if unset).
    pub ack_phase_timeout: Option<Duration>,

    /// How long a watch stays open.
    pub watch_duration: Duration,

    /// Per-attempt timeout for the watch registration round-trip.
    pub ack_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            use_ack: DEFAULT_USE_ACK,
            max_retries: DEFAULT_MAX_RETRIES,
            ack_phase_timeout: None,
            watch_duration: DEFAULT_WATCH_DURATION,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BOOKING_SERVER_ADDR").filter(|s| !s.is_empty()) {
            config.server_addr = addr;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BOOKING_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("BOOKING_USE_ACK") {
            config.use_ack = parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                var: "BOOKING_USE_ACK",
                value: raw,
            })?;
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "BOOKING_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(minutes) = parse_var::<u64>(&lookup, "BOOKING_WATCH_MINUTES")? {
            config.watch_duration = Duration::from_secs(minutes * 60);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BOOKING_ACK_TIMEOUT_SECS")? {
            config.ack_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Transport options for ordinary requests.
    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            timeout: self.request_timeout,
            use_ack: self.use_ack,
            max_retries: self.max_retries,
            ack_timeout: self.ack_phase_timeout,
        }
    }

    /// Options for a watch lasting `duration`.
    pub fn watch_options(&self, duration: Duration) -> WatchOptions {
        WatchOptions {
            duration,
            ack_timeout: self.ack_timeout,
            use_ack: self.use_ack,
            max_retries: self.max_retries,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server address.
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Enable or disable the ACK phase.
    pub fn use_ack(mut self, enabled: bool) -> Self {
        self.config.use_ack = enabled;
        self
    }

    /// Set the retransmission limit.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set an explicit ACK-phase deadline.
    pub fn ack_phase_timeout(mut self, timeout: Duration) -> Self {
        self.config.ack_phase_timeout = Some(timeout);
        self
    }

    /// Set the default watch duration.
    pub fn watch_duration(mut self, duration: Duration) -> Self {
        self.config.watch_duration = duration;
        self
    }

    /// Set the watch registration timeout.
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.config.ack_timeout = timeout;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr, "localhost:3000");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.use_ack);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.watch_duration, Duration::from_secs(600));
        assert_eq!(config.ack_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("BOOKING_SERVER_ADDR", "10.0.0.2:4000"),
            ("BOOKING_TIMEOUT_SECS", "9"),
            ("BOOKING_USE_ACK", "off"),
            ("BOOKING_MAX_RETRIES", "2"),
            ("BOOKING_WATCH_MINUTES", "3"),
            ("BOOKING_ACK_TIMEOUT_SECS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr, "10.0.0.2:4000");
        assert_eq!(config.request_timeout, Duration::from_secs(9));
        assert!(!config.use_ack);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.watch_duration, Duration::from_secs(180));
        assert_eq!(config.ack_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_from_lookup_invalid() {
        let err = ClientConfig::from_lookup(lookup_from(&[("BOOKING_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "BOOKING_MAX_RETRIES",
                value: "many".into()
            }
        );

        let err = ClientConfig::from_lookup(lookup_from(&[("BOOKING_USE_ACK", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "BOOKING_USE_ACK", .. }));
    }

    #[test]
    fn test_builder_and_options() {
        let config = ClientConfigBuilder::new()
            .server_addr("127.0.0.1:9")
            .request_timeout(Duration::from_secs(3))
            .use_ack(false)
            .max_retries(1)
            .ack_phase_timeout(Duration::from_millis(200))
            .ack_timeout(Duration::from_secs(2))
            .build();

        let send = config.send_options();
        assert_eq!(send.timeout, Duration::from_secs(3));
        assert!(!send.use_ack);
        assert_eq!(send.max_retries, 1);
        assert_eq!(send.ack_deadline(), Duration::from_millis(200));

        let watch = config.watch_options(Duration::from_secs(30));
        assert_eq!(watch.duration, Duration::from_secs(30));
        assert_eq!(watch.ack_timeout, Duration::from_secs(2));
        assert_eq!(watch.max_retries, 1);
    }
}
