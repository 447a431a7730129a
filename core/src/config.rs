//! Configuration loading
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path, else `CADENCE_CONFIG_PATH`, else
//!    `./cadence.toml` if it exists
//! 3. Environment variables `CADENCE_<SECTION>__<KEY>`, e.g.
//!    `CADENCE_SCHEDULER__DRAIN_POLICY=one_per_tick`
//!
//! A `.env` file in the working directory is read into the environment first.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::host::DrainPolicy;
use crate::script::vm::DEFAULT_MAX_CALL_DEPTH;

pub const ENV_PREFIX: &str = "CADENCE";
pub const CONFIG_PATH_ENV: &str = "CADENCE_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scripts: ScriptsConfig,
    pub scheduler: SchedulerConfig,
    pub driver: DriverConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Script files or directories of `.cds` files to load at startup
    pub paths: Vec<PathBuf>,
    /// Global function started as the first continuation
    pub entry: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            entry: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub drain_policy: DrainPolicy,
    pub max_call_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_policy: DrainPolicy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Ticks per second
    pub frame_rate: u32,
    /// Simulation time speed relative to real time
    pub time_scale: f64,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Stop once no continuation is left
    pub exit_when_idle: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            time_scale: 1.0,
            max_frames: None,
            exit_when_idle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<()> {
        if self.driver.frame_rate == 0 {
            bail!("driver.frame_rate must be greater than 0");
        }
        if !self.driver.time_scale.is_finite() || self.driver.time_scale < 0.0 {
            bail!(
                "driver.time_scale must be a finite, non-negative number (got {})",
                self.driver.time_scale
            );
        }
        if self.scheduler.max_call_depth == 0 {
            bail!("scheduler.max_call_depth must be greater than 0");
        }
        if self.scripts.entry.is_empty() {
            bail!("scripts.entry must not be empty");
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    skip_dotenv: bool,
}

impl ConfigBuilder {
    /// Config file to read instead of the default lookup
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self.skip_dotenv = true;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_dotenv {
            dotenvy::dotenv().ok();
        }

        let mut builder = config::Config::builder();
        if let Some(path) = self.resolve_path() {
            builder = builder.add_source(
                config::File::from(path.clone())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
            tracing::debug!(target: "cadence::host", path = %path.display(), "using config file");
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("scripts.paths")
                .source(self.env.clone()),
        );

        let config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        let from_env = match &self.env {
            Some(vars) => vars.get(CONFIG_PATH_ENV).cloned(),
            None => std::env::var(CONFIG_PATH_ENV).ok(),
        };
        if let Some(path) = from_env.filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    }
}
