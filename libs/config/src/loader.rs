//! Configuration loading
//!
//! Loads [`PoolkitConfig`] from a TOML file with optional environment-specific
//! overrides and `POOLKIT_` environment variables on top.

use crate::settings::{CacheSettings, OptimizerSettings};
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default location of the base configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/poolkit.toml";

/// Complete toolkit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolkitConfig {
    pub optimizer: OptimizerSettings,
    pub cache: CacheSettings,
}

impl PoolkitConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (POOLKIT_ prefix, __ between sections)
        builder = builder.add_source(
            Environment::with_prefix("POOLKIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string without file or environment sources
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.optimizer
            .validate()
            .context("Invalid optimizer settings")?;
        self.cache.validate().context("Invalid cache settings")
    }
}

/// Convenience function to load configuration from an optional path, falling
/// back to defaults when no file exists
pub fn load_config(path: Option<PathBuf>, environment: Option<&str>) -> Result<PoolkitConfig> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if !path.exists() {
        warn!("Config file {:?} not found, using defaults", path);
        return Ok(PoolkitConfig::default());
    }
    PoolkitConfig::load(Some(&path), environment)
}
