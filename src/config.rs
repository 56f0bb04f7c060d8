use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATA_DIR: &str = "data";
const CONFIG_DIR: &str = "config";

/// Application configuration: where the four table snapshots live, plus
/// logging and environment knobs. Loaded from `config/default` and
/// `config/{RUN_ENV}` files (both optional) overridden by
/// `FULFILLMENT__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding the table snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Per-table path overrides; each defaults to `{data_dir}/{table}.json`.
    /// The picking snapshot is typically pointed at the file maintained by
    /// the external order sync.
    #[serde(default)]
    pub picking_path: Option<PathBuf>,
    #[serde(default)]
    pub packages_path: Option<PathBuf>,
    #[serde(default)]
    pub separations_path: Option<PathBuf>,
    #[serde(default)]
    pub packing_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub log_level: String,

    #[serde(default = "default_environment")]
    #[validate(length(min = 1))]
    pub environment: String,
}

impl AppConfig {
    /// Minimal configuration rooted at a data directory, used by tests and
    /// embedders that skip file/environment loading.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            picking_path: None,
            packages_path: None,
            separations_path: None,
            packing_path: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            environment: DEFAULT_ENV.to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn picking_path(&self) -> PathBuf {
        self.table_path(&self.picking_path, "picking.json")
    }

    pub fn packages_path(&self) -> PathBuf {
        self.table_path(&self.packages_path, "packages.json")
    }

    pub fn separations_path(&self) -> PathBuf {
        self.table_path(&self.separations_path, "separations.json")
    }

    pub fn packing_path(&self) -> PathBuf {
        self.table_path(&self.packing_path, "packing.json")
    }

    fn table_path(&self, over: &Option<PathBuf>, file_name: &str) -> PathBuf {
        over.clone()
            .unwrap_or_else(|| self.data_dir.join(file_name))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

/// Load configuration from files and environment, then validate it.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let builder = Config::builder()
        .add_source(File::from(Path::new(CONFIG_DIR).join("default")).required(false))
        .add_source(File::from(Path::new(CONFIG_DIR).join(&run_env)).required(false))
        .add_source(Environment::with_prefix("FULFILLMENT").separator("__"));

    let app_config: AppConfig = builder.build()?.try_deserialize()?;
    app_config
        .validate()
        .map_err(|err| ConfigError::Message(err.to_string()))?;
    Ok(app_config)
}
