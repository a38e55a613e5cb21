//! Client configuration.
//!
//! Everything is explicit structs with defaults; a handful of `E6DATA_*`
//! environment variables override the retry, pool and strategy-cache
//! settings so deployments can tune them without code changes. Invalid
//! values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Environment variable names recognized by the client.
pub mod env {
    pub const STRATEGY_CACHE_TIMEOUT: &str = "E6DATA_STRATEGY_CACHE_TIMEOUT";
    pub const MAX_RETRY_ATTEMPTS: &str = "E6DATA_MAX_RETRY_ATTEMPTS";
    pub const RETRY_BACKOFF: &str = "E6DATA_RETRY_BACKOFF";
    pub const POOL_MIN: &str = "E6DATA_POOL_MIN";
    pub const POOL_MAX: &str = "E6DATA_POOL_MAX";
    pub const POOL_OVERFLOW: &str = "E6DATA_POOL_OVERFLOW";
    pub const POOL_RECYCLE: &str = "E6DATA_POOL_RECYCLE";
    pub const TLS_CERT_PATH: &str = "E6DATA_TLS_CERT_PATH";
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = raw, "ignoring unparseable environment override");
            None
        }
    }
}

/// Strategy-cache TTL from the environment; 0 disables expiry.
pub(crate) fn strategy_cache_ttl_from_env() -> Option<Duration> {
    match env_parse::<u64>(env::STRATEGY_CACHE_TIMEOUT) {
        Some(0) => None,
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => Some(Duration::from_secs(300)),
    }
}

/// TLS material for the channel.
#[derive(Clone, Debug, Default)]
pub enum TlsMode {
    /// Plaintext HTTP/2.
    #[default]
    Disabled,
    /// TLS with the system trust store.
    SystemRoots,
    /// TLS with a caller-supplied PEM certificate bundle.
    CustomPem(Vec<u8>),
}

impl TlsMode {
    /// Read PEM bytes from the path named in the environment, if any.
    pub fn from_env() -> Result<Option<TlsMode>> {
        let Ok(path) = std::env::var(env::TLS_CERT_PATH) else {
            return Ok(None);
        };
        let pem = std::fs::read(&path)
            .map_err(|e| Error::Configuration(format!("cannot read TLS material at {path}: {e}")))?;
        Ok(Some(TlsMode::CustomPem(pem)))
    }
}

/// Channel options. The menu is fixed; every option has an effect on the
/// channel the session manager builds.
#[derive(Clone, Debug)]
pub struct ChannelOptions {
    /// How long an outstanding keepalive ping may go unanswered before the
    /// channel is considered dead.
    pub keepalive_idle_timeout_ms: u64,
    /// Interval between HTTP/2 keepalive pings; `None` leaves keepalive to
    /// the transport default.
    pub keepalive_interval_ms: Option<u64>,
    /// Whether keepalive pings are sent while no call is active.
    pub keepalive_without_calls: bool,
    /// Cap on inbound message size.
    pub max_inbound_message_bytes: usize,
    /// Cap on outbound message size.
    pub max_outbound_message_bytes: usize,
    /// Upper bound on prepare-statement calls.
    pub prepare_timeout: Duration,
    /// HTTP/2 ping policy: pings allowed without payload data. Zero
    /// disables idle keepalive entirely.
    pub http2_max_pings_without_data: u32,
    /// HTTP/2 ping policy: floor for the time between pings; the keepalive
    /// interval is clamped to this.
    pub http2_min_time_between_pings_ms: u64,
    /// HTTP/2 ping policy: floor for the ping interval while the channel is
    /// idle; clamps the keepalive interval when pinging without calls.
    pub http2_min_ping_interval_without_data_ms: u64,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            keepalive_idle_timeout_ms: 900_000,
            keepalive_interval_ms: None,
            keepalive_without_calls: false,
            max_inbound_message_bytes: 100 * 1024 * 1024,
            max_outbound_message_bytes: 300 * 1024 * 1024,
            prepare_timeout: Duration::from_secs(600),
            http2_max_pings_without_data: 2,
            http2_min_time_between_pings_ms: 10_000,
            http2_min_ping_interval_without_data_ms: 300_000,
        }
    }
}

impl ChannelOptions {
    /// Effective keepalive interval after applying the ping-policy floors.
    pub(crate) fn effective_keepalive_interval(&self) -> Option<Duration> {
        let requested = self.keepalive_interval_ms?;
        let mut floor = self.http2_min_time_between_pings_ms;
        if self.keepalive_without_calls {
            if self.http2_max_pings_without_data == 0 {
                return None;
            }
            floor = floor.max(self.http2_min_ping_interval_without_data_ms);
        }
        Some(Duration::from_millis(requested.max(floor)))
    }
}

/// Retry budget shared by the auth-denied and wrong-strategy paths.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let mut policy = Self::default();
        if let Some(attempts) = env_parse::<u32>(env::MAX_RETRY_ATTEMPTS) {
            policy.max_attempts = attempts.max(1);
        }
        if let Some(seconds) = env_parse::<f64>(env::RETRY_BACKOFF) {
            if seconds >= 0.0 {
                policy.backoff = Duration::from_secs_f64(seconds);
            }
        }
        policy
    }
}

/// Everything needed to reach and authenticate against an engine cluster.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Account email.
    pub username: String,
    /// Access token issued by the console.
    pub password: String,
    pub database: Option<String>,
    pub catalog: Option<String>,
    pub cluster_uuid: Option<String>,
    pub tls: TlsMode,
    pub channel: ChannelOptions,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: None,
            catalog: None,
            cluster_uuid: None,
            tls: TlsMode::default(),
            channel: ChannelOptions::default(),
            retry: RetryPolicy::from_env(),
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn cluster_uuid(mut self, cluster_uuid: impl Into<String>) -> Self {
        self.cluster_uuid = Some(cluster_uuid.into());
        self
    }

    pub fn tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Configuration("port cannot be zero".into()));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(Error::Configuration(
                "username and password cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Connection pool sizing and health policy.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Channels kept warm.
    pub min: usize,
    /// Hard ceiling on resident channels.
    pub max: usize,
    /// Ephemeral channels allowed beyond `max` while all residents are busy.
    pub overflow: usize,
    /// Longest a caller waits for a free channel.
    pub acquire_timeout: Duration,
    /// Age at which a channel is recycled on return.
    pub recycle_age: Duration,
    /// Probe channel liveness before handing it out.
    pub pre_ping: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min: 2,
            max: 10,
            overflow: 5,
            acquire_timeout: Duration::from_secs(30),
            recycle_age: Duration::from_secs(3600),
            pre_ping: true,
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(min) = env_parse::<usize>(env::POOL_MIN) {
            config.min = min;
        }
        if let Some(max) = env_parse::<usize>(env::POOL_MAX) {
            config.max = max;
        }
        if let Some(overflow) = env_parse::<usize>(env::POOL_OVERFLOW) {
            config.overflow = overflow;
        }
        if let Some(recycle) = env_parse::<u64>(env::POOL_RECYCLE) {
            config.recycle_age = Duration::from_secs(recycle);
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.max == 0 {
            return Err(Error::Configuration("pool max must be at least 1".into()));
        }
        if self.min > self.max {
            return Err(Error::Configuration(format!(
                "pool min ({}) cannot exceed max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn client_config_rejects_empty_credentials() {
        assert!(ClientConfig::new("host", 80, "", "t").validate().is_err());
        assert!(ClientConfig::new("host", 80, "u", "").validate().is_err());
        assert!(ClientConfig::new("", 80, "u", "t").validate().is_err());
        assert!(ClientConfig::new("host", 0, "u", "t").validate().is_err());
        assert!(ClientConfig::new("host", 80, "u", "t").validate().is_ok());
    }

    #[test]
    fn pool_config_bounds_are_checked() {
        let bad = PoolConfig {
            min: 5,
            max: 2,
            ..PoolConfig::default()
        };
        assert!(bad.validate().is_err());
        let zero = PoolConfig {
            min: 0,
            max: 0,
            ..PoolConfig::default()
        };
        assert!(zero.validate().is_err());
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn keepalive_interval_respects_ping_floors() {
        let mut opts = ChannelOptions {
            keepalive_interval_ms: Some(1_000),
            ..ChannelOptions::default()
        };
        // Clamped up to the between-pings floor.
        assert_eq!(
            opts.effective_keepalive_interval(),
            Some(Duration::from_millis(10_000))
        );
        // While idle, the idle floor applies too.
        opts.keepalive_without_calls = true;
        assert_eq!(
            opts.effective_keepalive_interval(),
            Some(Duration::from_millis(300_000))
        );
        // Zero pings-without-data turns idle keepalive off.
        opts.http2_max_pings_without_data = 0;
        assert_eq!(opts.effective_keepalive_interval(), None);
    }

    #[test]
    #[serial]
    fn retry_policy_reads_env_overrides() {
        std::env::set_var(env::MAX_RETRY_ATTEMPTS, "3");
        std::env::set_var(env::RETRY_BACKOFF, "0.5");
        let policy = RetryPolicy::from_env();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(500));
        std::env::remove_var(env::MAX_RETRY_ATTEMPTS);
        std::env::remove_var(env::RETRY_BACKOFF);
    }

    #[test]
    #[serial]
    fn invalid_env_values_fall_back_to_defaults() {
        std::env::set_var(env::MAX_RETRY_ATTEMPTS, "many");
        let policy = RetryPolicy::from_env();
        assert_eq!(policy.max_attempts, RetryPolicy::default().max_attempts);
        std::env::remove_var(env::MAX_RETRY_ATTEMPTS);
    }

    #[test]
    #[serial]
    fn pool_env_overrides_apply() {
        std::env::set_var(env::POOL_MIN, "1");
        std::env::set_var(env::POOL_MAX, "4");
        std::env::set_var(env::POOL_OVERFLOW, "2");
        std::env::set_var(env::POOL_RECYCLE, "60");
        let config = PoolConfig::from_env();
        assert_eq!(config.min, 1);
        assert_eq!(config.max, 4);
        assert_eq!(config.overflow, 2);
        assert_eq!(config.recycle_age, Duration::from_secs(60));
        for var in [env::POOL_MIN, env::POOL_MAX, env::POOL_OVERFLOW, env::POOL_RECYCLE] {
            std::env::remove_var(var);
        }
    }
}
