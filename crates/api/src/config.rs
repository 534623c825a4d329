use chrono::Duration;

use bibliobox_core::lending::GracePolicy;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have sensible defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (shared secret with the identity provider).
    pub jwt: JwtConfig,
    /// Lending policy (grace windows, locker hold window, sweep cadence).
    pub lending: LendingConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();
        let lending = LendingConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            lending,
        }
    }
}

// ---------------------------------------------------------------------------
// Lending policy
// ---------------------------------------------------------------------------

/// Default pickup/return grace and locker hold window: 2 hours.
const DEFAULT_GRACE_SECS: i64 = 7200;

/// Default sweep cadence: 60 seconds.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Lending durations, injected wherever the lifecycle needs a cutoff.
///
/// The legacy system hard-coded these (inconsistently) at every call site;
/// here they are configuration, loaded once and passed down.
#[derive(Debug, Clone)]
pub struct LendingConfig {
    /// Seconds after `scheduled_pickup_time` a pickup is still accepted.
    pub pickup_grace_secs: i64,
    /// Seconds after `scheduled_return_time` a return still counts on time.
    pub return_grace_secs: i64,
    /// Length in seconds of a pickup/drop-off locker hold.
    pub locker_window_secs: i64,
    /// How often the background sweeps run, in seconds.
    pub sweep_interval_secs: u64,
}

impl LendingConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `PICKUP_GRACE_SECS`   | `7200`  |
    /// | `RETURN_GRACE_SECS`   | `7200`  |
    /// | `LOCKER_WINDOW_SECS`  | `7200`  |
    /// | `SWEEP_INTERVAL_SECS` | `60`    |
    ///
    /// # Panics
    ///
    /// Panics on non-positive durations — a zero-length locker window or
    /// grace would make every reservation unusable, so misconfiguration
    /// fails fast at startup.
    pub fn from_env() -> Self {
        let pickup_grace_secs = env_secs("PICKUP_GRACE_SECS", DEFAULT_GRACE_SECS);
        let return_grace_secs = env_secs("RETURN_GRACE_SECS", DEFAULT_GRACE_SECS);
        let locker_window_secs = env_secs("LOCKER_WINDOW_SECS", DEFAULT_GRACE_SECS);

        assert!(pickup_grace_secs > 0, "PICKUP_GRACE_SECS must be positive");
        assert!(return_grace_secs > 0, "RETURN_GRACE_SECS must be positive");
        assert!(locker_window_secs > 0, "LOCKER_WINDOW_SECS must be positive");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            pickup_grace_secs,
            return_grace_secs,
            locker_window_secs,
            sweep_interval_secs,
        }
    }

    /// The grace policy handed to the repository layer.
    pub fn grace_policy(&self) -> GracePolicy {
        GracePolicy {
            pickup_grace: Duration::seconds(self.pickup_grace_secs),
            return_grace: Duration::seconds(self.return_grace_secs),
            locker_window: Duration::seconds(self.locker_window_secs),
        }
    }
}

fn env_secs(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid i64"))
}
