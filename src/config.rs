//! System configuration parameters
//!
//! All tunable parameters for the cadence gate.  Values start from
//! [`MonitorConfig::default`], can be replaced by a JSON file named in
//! `CADENCE_CONFIG`, and are finally overridden field by field from the
//! environment.

use core::fmt;
use core::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::window::MAX_WINDOW;

/// Core monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // --- Decision ---
    /// Average cadence (RPM) at or above which access is allowed
    pub threshold_rpm: u32,
    /// Minimum dwell time between two gate changes (seconds)
    pub grace_period_secs: u32,
    /// Number of rate samples averaged
    pub window_size: usize,

    // --- Timing ---
    /// Evaluation tick period (milliseconds)
    pub tick_period_ms: u32,
    /// Delay between sensor reconnection attempts (seconds)
    pub reconnect_backoff_secs: u32,
    /// Status heartbeat interval (seconds)
    pub status_interval_secs: u32,
    /// Seconds without a sample before the crank is treated as stopped (0 = off)
    pub idle_timeout_secs: u32,

    // --- Shutdown ---
    /// Leave the rule enabled (blocked) when the monitor exits
    pub block_on_shutdown: bool,

    // --- Gate ---
    pub gate: GateConfig,
}

/// Gate service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Rule id on the gate service; resolved from `rule_name` when unset
    pub rule_id: Option<String>,
    /// Rule name used for lookup when no id is configured
    pub rule_name: String,
    /// Upper bound for a single gate call (milliseconds)
    pub call_timeout_ms: u32,
    /// Authentication strategy
    pub auth: Option<GateAuth>,
}

/// How the gate client authenticates.  Both strategies drive the same
/// [`GatePort`](crate::app::ports::GatePort) contract.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateAuth {
    /// Session login with username and password.
    Credentials { username: String, password: String },
    /// Static API key sent with every request.
    ApiKey { key: String },
}

impl GateAuth {
    /// Short label for logs; never includes the secret.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Credentials { .. } => "credentials",
            Self::ApiKey { .. } => "api-key",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Credentials { username, password } => {
                if username.is_empty() {
                    return Err(ConfigError::MissingCredential("UNIFI_USERNAME"));
                }
                if password.is_empty() {
                    return Err(ConfigError::MissingCredential("UNIFI_PASSWORD"));
                }
                Ok(())
            }
            Self::ApiKey { key } => {
                if key.is_empty() {
                    return Err(ConfigError::MissingCredential("UNIFI_API_KEY"));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for GateAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials { username, .. } => f
                .debug_struct("Credentials")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ApiKey { .. } => f.debug_struct("ApiKey").field("key", &"<redacted>").finish(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_rpm: 60,
            grace_period_secs: 3,
            window_size: 5,

            tick_period_ms: 1000,        // 1 Hz
            reconnect_backoff_secs: 10,
            status_interval_secs: 10,
            idle_timeout_secs: 5,

            block_on_shutdown: true,

            gate: GateConfig::default(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            rule_id: None,
            rule_name: "block_youtube_peloton".into(),
            call_timeout_ms: 10_000,
            auth: None,
        }
    }
}

impl MonitorConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.grace_period_secs))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_period_ms))
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_backoff_secs))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.status_interval_secs))
    }

    /// `None` when idle detection is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(u64::from(self.idle_timeout_secs)))
    }

    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.gate.call_timeout_ms))
    }

    /// Load from the process environment (and `CADENCE_CONFIG`, if set).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.  Used by [`load`] with
    /// `std::env::var` and by tests with a map.
    ///
    /// [`load`]: Self::load
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = match lookup("CADENCE_CONFIG") {
            Some(path) if !path.is_empty() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        override_num(&lookup, "CADENCE_THRESHOLD", &mut cfg.threshold_rpm)?;
        override_num(&lookup, "GRACE_PERIOD_SECONDS", &mut cfg.grace_period_secs)?;
        override_num(&lookup, "ROLLING_AVERAGE_WINDOW", &mut cfg.window_size)?;
        override_num(&lookup, "TICK_PERIOD_MS", &mut cfg.tick_period_ms)?;
        override_num(&lookup, "RECONNECT_BACKOFF_SECONDS", &mut cfg.reconnect_backoff_secs)?;
        override_num(&lookup, "STATUS_INTERVAL_SECONDS", &mut cfg.status_interval_secs)?;
        override_num(&lookup, "IDLE_TIMEOUT_SECONDS", &mut cfg.idle_timeout_secs)?;
        override_num(&lookup, "GATE_TIMEOUT_MS", &mut cfg.gate.call_timeout_ms)?;

        if let Some(v) = lookup("BLOCK_ON_SHUTDOWN") {
            cfg.block_on_shutdown = parse_bool(&v).ok_or(ConfigError::InvalidValue("BLOCK_ON_SHUTDOWN"))?;
        }
        if let Some(id) = lookup("FIREWALL_RULE_ID").filter(|s| !s.is_empty()) {
            cfg.gate.rule_id = Some(id);
        }
        if let Some(name) = lookup("FIREWALL_RULE_NAME").filter(|s| !s.is_empty()) {
            cfg.gate.rule_name = name;
        }

        // API key wins over username/password when both are present.
        if let Some(key) = lookup("UNIFI_API_KEY").filter(|s| !s.is_empty()) {
            cfg.gate.auth = Some(GateAuth::ApiKey { key });
        } else {
            let username = lookup("UNIFI_USERNAME");
            let password = lookup("UNIFI_PASSWORD");
            if username.is_some() || password.is_some() {
                cfg.gate.auth = Some(GateAuth::Credentials {
                    username: username.unwrap_or_default(),
                    password: password.unwrap_or_default(),
                });
            }
        }

        Ok(cfg)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::Unreadable)?;
        serde_json::from_str(&text).map_err(|_| ConfigError::Corrupted)
    }

    /// Range-check every field and require a gate credential.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold_rpm == 0 {
            return Err(ConfigError::ValidationFailed("threshold_rpm must be positive"));
        }
        if self.grace_period_secs == 0 {
            return Err(ConfigError::ValidationFailed("grace_period_secs must be positive"));
        }
        if !(1..=MAX_WINDOW).contains(&self.window_size) {
            return Err(ConfigError::ValidationFailed("window_size must be 1-64"));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_period_ms must be positive"));
        }
        if self.reconnect_backoff_secs == 0 {
            return Err(ConfigError::ValidationFailed("reconnect_backoff_secs must be positive"));
        }
        if self.status_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("status_interval_secs must be positive"));
        }
        if self.gate.call_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("gate.call_timeout_ms must be positive"));
        }
        if self.gate.rule_id.is_none() && self.gate.rule_name.is_empty() {
            return Err(ConfigError::ValidationFailed("either rule_id or rule_name is required"));
        }
        match &self.gate.auth {
            Some(auth) => auth.validate(),
            None => Err(ConfigError::MissingCredential("UNIFI_API_KEY or UNIFI_USERNAME/UNIFI_PASSWORD")),
        }
    }

    /// Log the effective configuration with secrets redacted.
    pub fn log_summary(&self) {
        info!("=== Cadence Gate Configuration ===");
        info!("Cadence threshold: {} RPM", self.threshold_rpm);
        info!("Grace period: {}s", self.grace_period_secs);
        info!("Rolling window: {} samples", self.window_size);
        info!(
            "Tick: {}ms | reconnect backoff: {}s | idle timeout: {}s",
            self.tick_period_ms, self.reconnect_backoff_secs, self.idle_timeout_secs
        );
        match &self.gate.rule_id {
            Some(id) => info!("Gate rule: id={}", id),
            None => info!("Gate rule: name='{}' (id resolved at startup)", self.gate.rule_name),
        }
        info!(
            "Gate auth: {}",
            self.gate.auth.as_ref().map_or("none", GateAuth::label)
        );
    }
}

fn override_num<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key))?;
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
