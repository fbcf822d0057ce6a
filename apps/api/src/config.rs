use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Rate-limit counters live in Redis when set, in process memory otherwise.
    pub redis_url: Option<String>,
    pub rate_limit_max: u64,
    pub rate_limit_window_secs: u64,
    pub occupations_path: PathBuf,
    pub avatar_fetch_remote: bool,
    pub avatar_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            redis_url: None,
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
            occupations_path: PathBuf::from("data/occupations.json"),
            avatar_fetch_remote: false,
            avatar_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        Ok(Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            redis_url: optional_env("REDIS_URL"),
            rate_limit_max: parse_env("RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window_secs: parse_env(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window_secs,
            )?,
            occupations_path: optional_env("OCCUPATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.occupations_path),
            avatar_fetch_remote: parse_env("AVATAR_FETCH_REMOTE", defaults.avatar_fetch_remote)?,
            avatar_max_bytes: parse_env("AVATAR_MAX_BYTES", defaults.avatar_max_bytes)?,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit_max, 10);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert!(config.redis_url.is_none());
        assert!(!config.avatar_fetch_remote);
    }

    #[test]
    fn test_parse_env_reports_bad_value() {
        std::env::set_var("PORTFOLIO_TEST_BAD_NUMBER", "ten");
        let err = parse_env::<u64>("PORTFOLIO_TEST_BAD_NUMBER", 10).unwrap_err();
        assert!(err.to_string().contains("PORTFOLIO_TEST_BAD_NUMBER"));
        std::env::remove_var("PORTFOLIO_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_parse_env_falls_back_when_unset() {
        assert!(parse_env::<bool>("PORTFOLIO_TEST_UNSET_FLAG", true).unwrap());
    }
}
