//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit `--config` path
//! 2. Current directory: ./tasktree.toml or ./.tasktree/config.toml
//! 3. User config: ~/.tasktree/config.toml
//! 4. Built-in defaults

use crate::env;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for driving a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Fixed delta per tick in seconds; also the realtime frame period
    pub tick_seconds: f64,
    /// Give up after this many ticks
    pub max_ticks: u64,
    /// Drive with measured wall-clock deltas instead of a fixed step
    pub realtime: bool,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: Option<String>,
    /// Print the tree every N ticks (0 = never)
    pub render_every: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 60.0,
            max_ticks: 10_000,
            realtime: false,
            log_filter: None,
            render_every: 0,
        }
    }
}

impl RunnerConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: RunnerConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("failed to write config file {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            bail!("tick_seconds must be a positive number, got {}", self.tick_seconds);
        }
        if self.max_ticks == 0 {
            bail!("max_ticks must be at least 1");
        }
        Ok(())
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(env::DEFAULT_LOG_FILTER)
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the explicit config if given, else the first file in the hierarchy,
    /// else defaults. Returns the path that was used, if any; the caller logs
    /// it once the subscriber is installed.
    pub fn discover_config(explicit: Option<&Path>) -> Result<(RunnerConfig, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((RunnerConfig::from_toml_file(path)?, Some(path.to_path_buf())));
        }

        if let Some(config_path) = Self::find_config_file() {
            let config = RunnerConfig::from_toml_file(&config_path)?;
            return Ok((config, Some(config_path)));
        }

        Ok((RunnerConfig::default(), None))
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::get_config_candidates()
            .into_iter()
            .find(|candidate| candidate.is_file())
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        Self::candidates_in(std_env::current_dir().ok().as_deref(), Self::get_home_dir().as_deref())
    }

    fn candidates_in(current_dir: Option<&Path>, home_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(current_dir) = current_dir {
            candidates.push(env::local_config_file_path(current_dir));
            candidates.push(env::local_dir_config_file_path(current_dir));
        }
        if let Some(home_dir) = home_dir {
            candidates.push(env::user_config_file_path(home_dir));
        }
        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info(explicit: Option<&Path>) -> Result<()> {
        println!("Configuration Discovery Hierarchy:");
        println!();

        if let Some(path) = explicit {
            println!("  0. {:?} - explicit --config", path);
        }
        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "EXISTS"
            } else if candidate.exists() {
                "NOT A FILE"
            } else {
                "NOT FOUND"
            };
            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        let (config, source) = Self::discover_config(explicit)?;
        println!();
        match source {
            Some(path) => println!("Active configuration: {:?}", path),
            None => println!("Active configuration: Built-in defaults"),
        }
        println!();
        print!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_runner_config() {
        let config = RunnerConfig::default();

        assert!((config.tick_seconds - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(config.max_ticks, 10_000);
        assert!(!config.realtime);
        assert_eq!(config.log_filter(), "tasktree=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RunnerConfig = toml::from_str("max_ticks = 12\nrealtime = true\n").unwrap();

        assert_eq!(config.max_ticks, 12);
        assert!(config.realtime);
        assert_eq!(config.render_every, 0);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tasktree.toml");

        let original = RunnerConfig {
            tick_seconds: 0.5,
            log_filter: Some("tasktree=trace".to_string()),
            ..RunnerConfig::default()
        };
        original.to_toml_file(&config_path).unwrap();

        let loaded = RunnerConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_invalid_tick_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "tick_seconds = 0.0\n").unwrap();

        let error = RunnerConfig::from_toml_file(&config_path).unwrap_err();
        assert!(error.to_string().contains("tick_seconds"));
    }

    #[test]
    fn test_explicit_config_wins() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custom.toml");
        fs::write(&config_path, "max_ticks = 3\n").unwrap();

        let (config, source) = ConfigDiscovery::discover_config(Some(&config_path)).unwrap();
        assert_eq!(config.max_ticks, 3);
        assert_eq!(source.as_deref(), Some(config_path.as_path()));
    }

    #[test]
    fn test_config_candidates_order() {
        let candidates = ConfigDiscovery::candidates_in(
            Some(Path::new("/project")),
            Some(Path::new("/home/user")),
        );

        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/project/tasktree.toml"),
                PathBuf::from("/project/.tasktree/config.toml"),
                PathBuf::from("/home/user/.tasktree/config.toml"),
            ]
        );
    }
}
