use std::{env, time::Duration};

use crate::admission::{
    DEFAULT_QUOTA_LIMIT_BYTES, DEFAULT_RATE_LIMIT_PER_WINDOW, DEFAULT_RATE_WINDOW,
};

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub quota_limit_bytes: u64,
    pub rate_limit_per_window: u32,
    pub rate_window_secs: u64,
    /// Unset means request bodies are not size-limited.
    pub max_body_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            quota_limit_bytes: DEFAULT_QUOTA_LIMIT_BYTES,
            rate_limit_per_window: DEFAULT_RATE_LIMIT_PER_WINDOW,
            rate_window_secs: DEFAULT_RATE_WINDOW.as_secs(),
            max_body_bytes: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            bind_addr: env_or("BIND_ADDR", &defaults.bind_addr),
            quota_limit_bytes: env_or_parse("QUOTA_LIMIT_BYTES", defaults.quota_limit_bytes)?,
            rate_limit_per_window: env_or_parse(
                "RATE_LIMIT_PER_WINDOW",
                defaults.rate_limit_per_window,
            )?,
            rate_window_secs: env_or_parse("RATE_WINDOW_SECS", defaults.rate_window_secs)?,
            max_body_bytes: env_parse_opt("MAX_BODY_BYTES")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    // Guardrail checks for nonsensical configuration.
    fn validate(&self) -> anyhow::Result<()> {
        if self.rate_window_secs == 0 {
            return Err(anyhow::anyhow!("RATE_WINDOW_SECS must be > 0"));
        }
        if self.max_body_bytes == Some(0) {
            return Err(anyhow::anyhow!("MAX_BODY_BYTES must be > 0"));
        }
        Ok(())
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_opt<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => Ok(Some(value.trim().parse()?)),
        Err(_) => Ok(None),
    }
}

fn env_or_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => Ok(value.trim().parse()?),
        Err(_) => Ok(default),
    }
}
