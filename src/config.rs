use std::env;
use std::str::FromStr;

use anyhow::anyhow;
use chrono_tz::Tz;
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Dates and times of scans are taken in this zone.
    pub timezone: Tz,
    pub public_dir: String,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_dir: String,
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| anyhow!("{key} must be set"))
}

fn or_default<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timezone_name: String = or_default(&lookup, "APP_TIMEZONE", "Asia/Jakarta".to_string())?;
        let timezone = Tz::from_str(&timezone_name)
            .map_err(|e| anyhow!("APP_TIMEZONE {timezone_name:?} is not a known zone: {e}"))?;

        Ok(Self {
            server_addr: required(&lookup, "SERVER_ADDR")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            access_token_ttl: or_default(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: or_default(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_scan_per_min: or_default(&lookup, "RATE_SCAN_PER_MIN", 120)?,
            rate_protected_per_min: or_default(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or_default(&lookup, "API_PREFIX", "/api/v1".to_string())?,
            timezone,
            public_dir: or_default(&lookup, "PUBLIC_DIR", "public".to_string())?,
            max_upload_bytes: or_default(&lookup, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            db_max_connections: or_default(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: or_default(&lookup, "RUN_MIGRATIONS", false)?,
            log_dir: or_default(&lookup, "LOG_DIR", "logs".to_string())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://root@localhost/swim"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.timezone, chrono_tz::Asia::Jakarta);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(!config.run_migrations);
    }

    #[test]
    fn missing_required_value_is_an_error() {
        let err = Config::from_lookup(lookup(&BASE[..2])).unwrap_err();
        assert!(format!("{err:#}").contains("JWT_SECRET"));
    }

    #[test]
    fn malformed_values_are_errors_not_panics() {
        let mut pairs = BASE.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL", "soon"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("APP_TIMEZONE", "Mars/Olympus"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn overrides_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.push(("APP_TIMEZONE", "Asia/Makassar"));
        pairs.push(("RUN_MIGRATIONS", "true"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.timezone, chrono_tz::Asia::Makassar);
        assert!(config.run_migrations);
    }
}
