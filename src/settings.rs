use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{KeeperError, Result};
use crate::filter::DEFAULT_PAGE_SIZE;
use crate::persist::{PersistenceMode, DEFAULT_BUSY_TIMEOUT};

pub const DEFAULT_CONFIG_FILE: &str = "propkeeper";
pub const ENVIRONMENT_PREFIX: &str = "PROPKEEPER";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database file; in-memory when absent.
    #[serde(default)]
    pub path: Option<String>,
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    pub fn persistence_mode(&self) -> PersistenceMode {
        match &self.path {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub default_page_size: i64,
    pub log_filter: String,
    /// Tag keys guaranteed to exist at startup. They cannot be removed.
    #[serde(default)]
    pub tag_domain: Vec<String>,
}

impl Settings {
    /// Layers defaults, then the config file (`propkeeper.*` in the working
    /// directory unless a path is given), then `PROPKEEPER_*` variables with
    /// `__` between nested keys, e.g. `PROPKEEPER_DATABASE__PATH`.
    pub fn load(file: Option<&str>) -> Result<Settings> {
        let builder = Config::builder()
            .set_default("database.busy_timeout_ms", DEFAULT_BUSY_TIMEOUT.as_millis() as u64)?
            .set_default("default_page_size", DEFAULT_PAGE_SIZE)?
            .set_default("log_filter", "info")?
            .set_default("tag_domain", Vec::<String>::new())?;
        let builder = match file {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tag_domain")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
    fn validate(&self) -> Result<()> {
        if self.default_page_size < 1 {
            return Err(KeeperError::Config(format!(
                "default_page_size must be >= 1, got {}",
                self.default_page_size
            )));
        }
        Ok(())
    }
}
