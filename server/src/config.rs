//! # Server Configuration
//!
//! Settings are read from a single YAML file. The path comes from the
//! `PRET_CONFIG` environment variable, or defaults to `pret.yaml` in the
//! platform data directory (e.g. `~/.local/share/pret/pret.yaml`).
//! Every field is optional.
//!
//! ```yaml
//! database_url: "sqlite:///var/lib/pret/pret.db"
//! bind_address: "127.0.0.1:3000"
//! default_interest_rate_percent: 5
//! default_grace_period_months: 2
//! overdue_scan_interval_secs: 86400
//! log_level: "info"
//! allowed_origin: "http://localhost:8080"
//! known_members:
//!   - "member::1"
//!   - "member::2"
//! ```

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::backend::domain::loan_registry::LoanPolicy;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "PRET_CONFIG";

const CONFIG_FILE_NAME: &str = "pret.yaml";
const DATA_DIR_NAME: &str = "pret";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// sqlx SQLite connection URL
    pub database_url: String,
    pub max_connections: u32,
    pub bind_address: String,
    pub default_interest_rate_percent: Decimal,
    pub default_grace_period_months: u32,
    pub overdue_scan_interval_secs: u64,
    /// Used when `RUST_LOG` is not set
    pub log_level: String,
    /// Origin allowed by CORS; any origin when unset
    pub allowed_origin: Option<String>,
    /// Restrict borrowers and guarantors to these ids; any non-blank id when unset
    pub known_members: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let database_path = data_directory().join("pret.db");
        Self {
            database_url: format!("sqlite://{}", database_path.display()),
            max_connections: 5,
            bind_address: "127.0.0.1:3000".to_string(),
            default_interest_rate_percent: Decimal::new(5, 0),
            default_grace_period_months: 2,
            overdue_scan_interval_secs: 86_400,
            log_level: "info".to_string(),
            allowed_origin: None,
            known_members: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration from `PRET_CONFIG` or the default location.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file named explicitly is an error.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path)),
            None => {
                let path = data_directory().join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    info!("No config file at {:?}, using defaults", path);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_interest_rate_percent < Decimal::ZERO {
            bail!("default_interest_rate_percent cannot be negative");
        }
        if self.default_grace_period_months == 0 {
            bail!("default_grace_period_months must be at least 1");
        }
        if self.overdue_scan_interval_secs == 0 {
            bail!("overdue_scan_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn loan_policy(&self) -> LoanPolicy {
        LoanPolicy {
            default_interest_rate_percent: self.default_interest_rate_percent,
            default_grace_period_months: self.default_grace_period_months,
        }
    }

    pub fn overdue_scan_interval(&self) -> Duration {
        Duration::from_secs(self.overdue_scan_interval_secs)
    }

    /// Filesystem path of the database, if `database_url` points at a file
    pub fn database_path(&self) -> Option<PathBuf> {
        let path = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.starts_with(":memory:") {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

fn data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}
