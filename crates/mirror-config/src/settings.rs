use crate::{env::EnvManager, error::ConfigError};
use chrono::Duration;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_API_BASE_URL: &str = "https://services.nvd.nist.gov";

const ARCHIVE_SUBDIR: &str = "raw_api_responses";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    /// Key/value connection string accepted by tokio-postgres.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.name, self.user, self.password
        )
    }
}

/// Process configuration assembled from system env and an optional `.env`
/// file. Everything has a workable default except the API key, whose
/// absence only lowers the rate budget.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub db: DbConfig,
    pub data_dir: PathBuf,
    pub retention_days: u32,
    pub safety_delay_minutes: i64,
    pub results_per_page: usize,
}

impl MirrorConfig {
    pub fn from_env(env: &EnvManager) -> Result<Self, ConfigError> {
        let api_key = env
            .get("NVD_API_KEY")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        if api_key.is_none() {
            warn!("NVD_API_KEY is not set; running at the public rate budget");
        }

        let api_base_url = env
            .get("NVD_API_URL")
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let db = DbConfig {
            host: string_or(env, "DB_HOST", "localhost"),
            port: parse_or(env, "DB_PORT", 5432)?,
            name: string_or(env, "DB_NAME", "nvd_db"),
            user: string_or(env, "DB_USER", "nvd_user"),
            password: string_or(env, "DB_PASSWORD", "nvdpassword"),
        };

        Ok(Self {
            api_key,
            api_base_url,
            db,
            data_dir: PathBuf::from(string_or(env, "DATA_DIR", "./data")),
            retention_days: parse_or(env, "RETENTION_DAYS", 90)?,
            safety_delay_minutes: parse_or(env, "SAFETY_DELAY_MINUTES", 5)?,
            results_per_page: parse_or(env, "RESULTS_PER_PAGE", 2000)?,
        })
    }

    /// Directory raw API pages are archived under.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_SUBDIR)
    }

    pub fn safety_delay(&self) -> Duration {
        Duration::minutes(self.safety_delay_minutes)
    }

    pub fn retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.retention_days) * 24 * 60 * 60)
    }
}

fn string_or(env: &EnvManager, key: &str, default: &str) -> String {
    env.get(key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_or<T>(env: &EnvManager, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env.get(key).map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvManager {
        EnvManager::from_vars(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn defaults_cover_everything_but_the_key() {
        let config = MirrorConfig::from_env(&env(&[])).unwrap();

        assert!(config.api_key.is_none());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 5432);
        assert_eq!(config.db.name, "nvd_db");
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.safety_delay_minutes, 5);
        assert_eq!(config.results_per_page, 2000);
        assert!(config.archive_dir().ends_with("raw_api_responses"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = MirrorConfig::from_env(&env(&[
            ("NVD_API_KEY", "secret"),
            ("NVD_API_URL", "http://localhost:8080/"),
            ("DB_PORT", "5433"),
            ("RESULTS_PER_PAGE", "500"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.db.port, 5433);
        assert_eq!(config.results_per_page, 500);
    }

    #[test]
    fn blank_key_counts_as_absent() {
        let config = MirrorConfig::from_env(&env(&[("NVD_API_KEY", "  ")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn unparseable_numbers_are_rejected() {
        let err = MirrorConfig::from_env(&env(&[("DB_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "DB_PORT", .. }));
    }

    #[test]
    fn connection_string_is_key_value_form() {
        let config = MirrorConfig::from_env(&env(&[])).unwrap();
        let conn = config.db.connection_string();
        assert!(conn.contains("host=localhost"));
        assert!(conn.contains("dbname=nvd_db"));
    }
}
