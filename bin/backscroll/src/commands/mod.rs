pub mod check;
pub mod scrape;

use backscroll_core::{Config, Paths};
use std::path::PathBuf;

/// Where this invocation reads and writes its files.
pub struct Context {
    pub paths: Paths,
    pub config_path: PathBuf,
}

impl Context {
    pub fn new(data_dir: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        let paths = data_dir.map(Paths::with_base).unwrap_or_default();
        let config_path = config.unwrap_or_else(|| paths.config_file());
        Self { paths, config_path }
    }

    /// The config file (defaults when absent) with the environment applied on top.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(&self.config_path)?;
        config.apply_env()?;
        Ok(config)
    }
}
