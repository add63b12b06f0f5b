use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "market_config.json";
const DEFAULT_PORT: u16 = 3000;

const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_SCHEMA: &str = "ANALYTICS";
const DEFAULT_TABLE: &str = "PREDICTED_PRICES";
const DEFAULT_CACHE_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub sentry_dsn: Option<String>,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            config_path: std::env::var("MARKET_CONFIG_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            sentry_dsn: std::env::var("SENTRY_DSN").ok().filter(|s| !s.is_empty()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        })
    }

    pub fn load_app_config(&self) -> anyhow::Result<AppConfig> {
        AppConfig::load(&self.config_path)
    }
}

/// Contents of the market config file. Anything missing or malformed is a startup failure.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(alias = "snowflake")]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Clone, Deserialize)]
pub struct WarehouseConfig {
    pub user: String,
    pub password: String,
    /// Host of the warehouse endpoint.
    pub account: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    /// Compute resource the session is attributed to (sent as `application_name`).
    pub warehouse: String,
    pub database: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .field("port", &self.port)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_start_date")]
    pub default_start_date: NaiveDate,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_start_date: default_start_date(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl DashboardConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs.min(i32::MAX as u64) as i64)
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let cfg = serde_json::from_str::<AppConfig>(text)
            .context("config does not match the expected structure")?;
        cfg.warehouse.validate()?;
        Ok(cfg)
    }
}

impl WarehouseConfig {
    fn validate(&self) -> anyhow::Result<()> {
        for (key, value) in [
            ("user", &self.user),
            ("password", &self.password),
            ("account", &self.account),
            ("warehouse", &self.warehouse),
            ("database", &self.database),
            ("schema", &self.schema),
            ("table", &self.table),
        ] {
            anyhow::ensure!(!value.trim().is_empty(), "warehouse.{key} must be non-empty");
        }
        Ok(())
    }
}

fn default_pg_port() -> u16 {
    DEFAULT_PG_PORT
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_config() -> serde_json::Value {
        json!({
            "warehouse": {
                "user": "dash",
                "password": "hunter2",
                "account": "db.internal",
                "port": 6432,
                "warehouse": "COMPUTE_WH",
                "database": "SIGNAL_EXTRACTION_DB",
                "schema": "ANALYTICS",
                "table": "PREDICTED_PRICES"
            },
            "dashboard": {
                "default_start_date": "2025-02-01",
                "cache_ttl_secs": 60
            }
        })
    }

    #[test]
    fn parses_full_config() {
        let cfg = AppConfig::from_json_str(&full_config().to_string()).unwrap();
        assert_eq!(cfg.warehouse.port, 6432);
        assert_eq!(cfg.warehouse.database, "SIGNAL_EXTRACTION_DB");
        assert_eq!(
            cfg.dashboard.default_start_date,
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert_eq!(cfg.dashboard.cache_ttl(), chrono::Duration::seconds(60));
    }

    #[test]
    fn accepts_snowflake_section_name_and_fills_defaults() {
        let v = json!({
            "snowflake": {
                "user": "dash",
                "password": "hunter2",
                "account": "db.internal",
                "warehouse": "COMPUTE_WH",
                "database": "SIGNAL_EXTRACTION_DB"
            },
            "other_section": {"ignored": true}
        });

        let cfg = AppConfig::from_json_str(&v.to_string()).unwrap();
        assert_eq!(cfg.warehouse.port, 5432);
        assert_eq!(cfg.warehouse.schema, "ANALYTICS");
        assert_eq!(cfg.warehouse.table, "PREDICTED_PRICES");
        assert_eq!(cfg.dashboard.cache_ttl_secs, 600);
        assert_eq!(
            cfg.dashboard.default_start_date,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn rejects_missing_required_key() {
        let mut v = full_config();
        v["warehouse"].as_object_mut().unwrap().remove("password");
        assert!(AppConfig::from_json_str(&v.to_string()).is_err());
    }

    #[test]
    fn rejects_blank_required_value() {
        let mut v = full_config();
        v["warehouse"]["database"] = json!("  ");
        let err = AppConfig::from_json_str(&v.to_string()).unwrap_err();
        assert!(err.to_string().contains("warehouse.database"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AppConfig::from_json_str("{ \"warehouse\": ").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("signalboard-config-does-not-exist.json");
        let err = AppConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "signalboard-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, full_config().to_string()).unwrap();
        let cfg = AppConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.unwrap().warehouse.user, "dash");
    }

    #[test]
    fn debug_output_redacts_password() {
        let cfg = AppConfig::from_json_str(&full_config().to_string()).unwrap();
        let s = format!("{:?}", cfg.warehouse);
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<redacted>"));
    }
}
