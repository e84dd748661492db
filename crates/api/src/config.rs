use std::str::FromStr;

use fleetpulse_core::rules::RuleThresholds;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for open WebSocket sessions to drain (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Postgres connection string. When unset alerts are kept in memory.
    pub database_url: Option<String>,
    /// Per-subscriber message buffer (default: `256`).
    pub subscriber_buffer: usize,
    /// Interval between WebSocket pings in seconds (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// Thresholds for the built-in rules.
    pub rules: RuleThresholds,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `8000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `10`                    |
    /// | `DATABASE_URL`           | unset (in-memory store) |
    /// | `SUBSCRIBER_BUFFER`      | `256`                   |
    /// | `HEARTBEAT_INTERVAL_SECS`| `30`                    |
    /// | `RULE_HARSH_ACCEL`       | `15`                    |
    /// | `RULE_OVERSPEED_KMH`     | `120`                   |
    /// | `RULE_LOW_BATTERY_PCT`   | `20`                    |
    /// | `RULE_OVERHEAT_CELSIUS`  | `100`                   |
    /// | `LOG_FORMAT`             | `pretty` (or `json`)    |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let defaults = RuleThresholds::default();
        let rules = RuleThresholds {
            harsh_accel: env_or("RULE_HARSH_ACCEL", defaults.harsh_accel),
            overspeed_kmh: env_or("RULE_OVERSPEED_KMH", defaults.overspeed_kmh),
            low_battery_pct: env_or("RULE_LOW_BATTERY_PCT", defaults.low_battery_pct),
            overheat_celsius: env_or("RULE_OVERHEAT_CELSIUS", defaults.overheat_celsius),
        };

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let subscriber_buffer: usize =
            env_or("SUBSCRIBER_BUFFER", fleetpulse_events::DEFAULT_BUFFER);
        assert!(subscriber_buffer > 0, "SUBSCRIBER_BUFFER must be at least 1");

        let heartbeat_interval_secs: u64 = env_or("HEARTBEAT_INTERVAL_SECS", 30);
        assert!(
            heartbeat_interval_secs > 0,
            "HEARTBEAT_INTERVAL_SECS must be at least 1"
        );

        Self {
            host,
            port: env_or("PORT", 8000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 10),
            database_url,
            subscriber_buffer,
            heartbeat_interval_secs,
            rules,
            log_json,
        }
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_uses_default_for_missing_key() {
        let value: u64 = env_or("FLEETPULSE_TEST_SURELY_UNSET_KEY", 42);
        assert_eq!(value, 42);
    }

    #[test]
    #[should_panic(expected = "FLEETPULSE_TEST_BAD_PORT must be a valid u16")]
    fn env_or_panics_on_garbage() {
        std::env::set_var("FLEETPULSE_TEST_BAD_PORT", "not-a-port");
        let _: u16 = env_or("FLEETPULSE_TEST_BAD_PORT", 8000);
    }
}
