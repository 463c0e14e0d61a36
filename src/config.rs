//! Configuration management for cputrack
//!
//! This module provides TOML persistence for the sampler thresholds and the
//! system probe's data sources.

use crate::error::{CpuTrackError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// cputrack configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Process CPU time sampler options
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// System-wide probe options
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Process CPU time sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Tasks between collections for persistent (long-lived) processes
    #[serde(default = "default_persistent_interval")]
    pub persistent_reporting_interval: u64,
    /// Tasks between collections for all other processes
    #[serde(default = "default_other_interval")]
    pub other_reporting_interval: u64,
    /// Minimum wall time between average load reports (seconds)
    #[serde(default = "default_avg_load_interval")]
    pub avg_load_report_interval_secs: u64,
    /// Minimum wall time between average load reports when idle (seconds)
    #[serde(default = "default_idle_load_interval")]
    pub idle_load_report_interval_secs: u64,
}

/// System probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Path of the per-core counter file
    #[serde(default = "default_stat_path")]
    pub stat_path: PathBuf,
    /// Root of the per-core cpufreq sysfs tree
    #[serde(default = "default_cpufreq_root")]
    pub cpufreq_root: PathBuf,
    /// Time between probe samples in milliseconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
}

// Default value functions
fn default_persistent_interval() -> u64 {
    2500
}

fn default_other_interval() -> u64 {
    1000
}

fn default_avg_load_interval() -> u64 {
    30
}

fn default_idle_load_interval() -> u64 {
    5
}

fn default_stat_path() -> PathBuf {
    PathBuf::from("/proc/stat")
}

fn default_cpufreq_root() -> PathBuf {
    PathBuf::from("/sys/devices/system/cpu")
}

fn default_sample_interval() -> u64 {
    1000 // 1 second
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            persistent_reporting_interval: default_persistent_interval(),
            other_reporting_interval: default_other_interval(),
            avg_load_report_interval_secs: default_avg_load_interval(),
            idle_load_report_interval_secs: default_idle_load_interval(),
        }
    }
}

impl SamplerConfig {
    /// Average load report interval as a `Duration`
    pub fn avg_load_report_interval(&self) -> Duration {
        Duration::from_secs(self.avg_load_report_interval_secs)
    }

    /// Idle load report interval as a `Duration`
    pub fn idle_load_report_interval(&self) -> Duration {
        Duration::from_secs(self.idle_load_report_interval_secs)
    }

    /// Reject thresholds that would make the sampler collect on every task
    /// or never report load.
    pub fn validate(&self) -> Result<()> {
        if self.persistent_reporting_interval == 0 || self.other_reporting_interval == 0 {
            return Err(CpuTrackError::ConfigError(
                "reporting intervals must be at least one task".to_string(),
            ));
        }
        if self.idle_load_report_interval_secs > self.avg_load_report_interval_secs {
            return Err(CpuTrackError::ConfigError(format!(
                "idle load interval ({}s) exceeds average load interval ({}s)",
                self.idle_load_report_interval_secs, self.avg_load_report_interval_secs
            )));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stat_path: default_stat_path(),
            cpufreq_root: default_cpufreq_root(),
            sample_interval_ms: default_sample_interval(),
        }
    }
}

impl ProbeConfig {
    /// Sample interval as a `Duration`
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Config {
    /// Get the default configuration directory
    ///
    /// Returns `~/.config/cputrack` on Unix-like systems,
    /// or `%APPDATA%\cputrack` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(windows) {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from(".config"))
        };

        Ok(config_dir.join("cputrack"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_file = Self::default_path()?.join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| CpuTrackError::Parse(format!("Failed to parse config: {}", e)))?;
        config.sampler.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::default_path()?;
        std::fs::create_dir_all(&config_dir)?;
        self.save_to(&config_dir.join("config.toml"))
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CpuTrackError::Other(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
