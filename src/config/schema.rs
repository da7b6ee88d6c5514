//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the admission gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream application that receives admitted requests.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Static asset bypass rules.
    pub bypass: BypassConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// How the limiter draws window edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// One process-wide window. A rollover resets only the client that
    /// triggered it; other clients keep their counts.
    #[default]
    Shared,
    /// Every client owns its own window start.
    PerClient,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_size_ms: u64,

    /// Requests a client may make inside one window.
    pub max_requests_per_window: u32,

    /// Shared or per-client window edges.
    pub window_mode: WindowMode,

    /// Idle entry sweep interval in seconds. 0 sweeps once per window in
    /// per-client mode and never in shared mode.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size_ms: 10_000,
            max_requests_per_window: 10,
            window_mode: WindowMode::Shared,
            sweep_interval_secs: 0,
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration.
    pub fn window_size(&self) -> Duration {
        Duration::from_millis(self.window_size_ms)
    }

    /// Get the sweep interval, if the sweep is enabled.
    ///
    /// Shared-mode counters are never purged, so the sweep only runs there
    /// when asked for explicitly.
    pub fn sweep_interval(&self) -> Option<Duration> {
        match (self.sweep_interval_secs, self.window_mode) {
            (0, WindowMode::Shared) => None,
            (0, WindowMode::PerClient) => Some(self.window_size()).filter(|d| !d.is_zero()),
            (secs, _) => Some(Duration::from_secs(secs)),
        }
    }
}

/// Paths that skip the gate entirely.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BypassConfig {
    /// Path prefixes served as static build assets.
    pub prefixes: Vec<String>,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["/_next/".to_string(), "/favicon.ico".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
