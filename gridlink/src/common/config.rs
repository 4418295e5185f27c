/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use gridlink_core::prelude::{ConfigError, DomainInfo};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Configuration for a gridlink node.
///
/// Loaded from TOML in XDG-compliant directories; every section falls back to
/// its defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridlinkConfig {
    /// Identity of this subsystem, written into every scheduled task
    pub domain: DomainConfig,
    /// Registry and dispatch behaviour
    pub dispatch: DispatchConfig,
    /// Due-task poller settings
    pub scheduler: SchedulerConfig,
    /// Bundle aggregation settings
    pub bundle: BundleConfig,
    /// Channel capacities and concurrency limits
    pub limits: LimitsConfig,
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Tracing and logging configuration
    pub tracing: TracingConfig,
    /// Path configuration for various directories
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Refuse to start unless every message type has a handler.
    pub require_complete_registry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// Maximum number of tasks moved to DUE per tick
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Pending slots older than this are failed with a TIMEOUT descriptor
    pub response_timeout_ms: u64,
    /// Complete bundles are dropped this long after their last slot filled
    pub retention_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub inbound_capacity: usize,
    pub outbound_capacity: usize,
    pub max_concurrent_dispatches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub system_shutdown_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Also write a daily-rolling log file under `paths.log_directory`
    pub log_to_file: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: String,
    pub data_directory: String,
    pub config_directory: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: "SMART_METERING".to_string(),
            version: "1.0".to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            require_complete_registry: true,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1_000,
            batch_size: 50,
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 300_000,
            retention_ms: 600_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 255,
            outbound_capacity: 255,
            max_concurrent_dispatches: 16,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            system_shutdown_timeout_ms: 30_000,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: "~/.local/share/gridlink/logs".to_string(),
            data_directory: "~/.local/share/gridlink".to_string(),
            config_directory: "~/.config/gridlink".to_string(),
        }
    }
}

impl GridlinkConfig {
    pub fn domain_info(&self) -> DomainInfo {
        DomainInfo::new(self.domain.name.clone(), self.domain.version.clone())
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.poll_interval_ms)
    }

    pub const fn bundle_response_timeout(&self) -> Duration {
        Duration::from_millis(self.bundle.response_timeout_ms)
    }

    pub const fn bundle_retention(&self) -> Duration {
        Duration::from_millis(self.bundle.retention_ms)
    }

    pub const fn system_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.system_shutdown_timeout_ms)
    }

    /// The data directory with a leading `~` expanded.
    pub fn data_directory(&self) -> PathBuf {
        expand_home(&self.paths.data_directory)
    }

    /// The log directory with a leading `~` expanded.
    pub fn log_directory(&self) -> PathBuf {
        expand_home(&self.paths.log_directory)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads configuration from an explicit file. Unlike [`load`](Self::load),
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&source).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `gridlink/config.toml` under `$XDG_CONFIG_HOME` and the XDG
    /// config search path. If no file is found, returns the default
    /// configuration. If a file exists but is malformed, logs an error and uses
    /// defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("gridlink") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::load_from(&path) {
                    Ok(config) => {
                        info!("Successfully loaded configuration");
                        config
                    }
                    Err(e) => {
                        error!("{}", e);
                        Self::default()
                    }
                }
            }
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_about_the_registry() {
        let config = GridlinkConfig::default();
        assert!(config.dispatch.require_complete_registry);
        assert_eq!(config.domain_info().domain, "SMART_METERING");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = GridlinkConfig::from_toml_str(
            r#"
            [scheduler]
            poll_interval_ms = 250

            [bundle]
            response_timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.poll_interval_ms, 250);
        assert_eq!(config.scheduler.batch_size, 50);
        assert_eq!(config.bundle_response_timeout(), Duration::from_secs(5));
        assert_eq!(config.bundle_retention(), Duration::from_secs(600));
        assert_eq!(config.limits, LimitsConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let error = GridlinkConfig::from_toml_str("[scheduler\nenabled = true").unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn only_leading_tilde_is_expanded() {
        assert_eq!(expand_home("/var/lib/gridlink"), PathBuf::from("/var/lib/gridlink"));
        assert_eq!(expand_home("data/~"), PathBuf::from("data/~"));
    }
}
