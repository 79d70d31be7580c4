//! Runtime configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default so the server starts with an empty
//! environment. Unparseable values fall back to the default rather than
//! aborting startup; only the bind address can fail, and only at bind time.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_INACTIVITY_SECS: u64 = 600;
pub const DEFAULT_RETENTION_CAP: usize = 100;
pub const DEFAULT_RETENTION_KEEP: usize = 50;
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Tuning knobs for the chat store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long an author may stay silent before their messages are evicted.
    pub inactivity: Duration,
    /// Log length that triggers a trim.
    pub retention_cap: usize,
    /// Messages kept after a trim (most recent first).
    pub retention_keep: usize,
    /// Messages returned by a recent-messages query.
    pub recent_limit: usize,
}

impl StoreConfig {
    /// Build store config from environment variables.
    ///
    /// Optional:
    /// - `CHAT_INACTIVITY_SECS`: default 600
    /// - `CHAT_RETENTION_CAP`: default 100
    /// - `CHAT_RETENTION_KEEP`: default 50
    /// - `CHAT_RECENT_LIMIT`: default 50
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            inactivity: Duration::from_secs(env_parse("CHAT_INACTIVITY_SECS", DEFAULT_INACTIVITY_SECS)),
            retention_cap: env_parse("CHAT_RETENTION_CAP", DEFAULT_RETENTION_CAP),
            retention_keep: env_parse("CHAT_RETENTION_KEEP", DEFAULT_RETENTION_KEEP),
            recent_limit: env_parse("CHAT_RECENT_LIMIT", DEFAULT_RECENT_LIMIT),
        }
        .normalized()
    }

    /// Clamp values into a consistent shape: `keep <= cap`, non-zero inactivity.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.inactivity.is_zero() {
            self.inactivity = Duration::from_secs(DEFAULT_INACTIVITY_SECS);
        }
        if self.retention_keep > self.retention_cap {
            self.retention_keep = self.retention_cap;
        }
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            inactivity: Duration::from_secs(DEFAULT_INACTIVITY_SECS),
            retention_cap: DEFAULT_RETENTION_CAP,
            retention_keep: DEFAULT_RETENTION_KEEP,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Load `.env` (if present) and read `HOST`, `PORT` and the store knobs.
    #[must_use]
    pub fn from_env() -> Self {
        // Missing .env is the normal case outside local development.
        let _ = dotenvy::dotenv();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env_parse("PORT", DEFAULT_PORT),
            store: StoreConfig::from_env(),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
