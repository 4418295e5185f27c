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

use std::fs;
use std::time::Duration;

use gridlink::prelude::*;
use gridlink_test::prelude::*;
use tempfile::TempDir;

/// A config file found through `XDG_CONFIG_HOME` overrides the defaults it
/// names and leaves the rest alone.
#[gridlink_test]
async fn test_xdg_configuration_is_loaded() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().join("gridlink");
    fs::create_dir_all(&config_dir)?;

    let config_content = r#"
        [domain]
        name = "DISTRIBUTION_AUTOMATION"

        [scheduler]
        poll_interval_ms = 250
        batch_size = 5

        [bundle]
        response_timeout_ms = 1500

        [timeouts]
        system_shutdown_timeout_ms = 2000
    "#;
    fs::write(config_dir.join("config.toml"), config_content)?;
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());

    let config = GridlinkConfig::load();

    assert_eq!(config.domain.name, "DISTRIBUTION_AUTOMATION");
    assert_eq!(config.domain.version, "1.0");
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.scheduler.batch_size, 5);
    assert!(config.scheduler.enabled);
    assert_eq!(config.bundle_response_timeout(), Duration::from_millis(1500));
    assert_eq!(config.system_shutdown_timeout(), Duration::from_secs(2));
    assert_eq!(config.limits, GridlinkConfig::default().limits);

    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_defaults_match_documented_values() {
    let config = GridlinkConfig::default();
    assert_eq!(config.domain_info().domain, "SMART_METERING");
    assert!(config.dispatch.require_complete_registry);
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
    assert_eq!(config.scheduler.batch_size, 50);
    assert_eq!(config.bundle_response_timeout(), Duration::from_secs(300));
    assert_eq!(config.limits.max_concurrent_dispatches, 16);
    assert_eq!(config.tracing.level, "info");
}

#[test]
fn test_invalid_files_are_reported() {
    let temp_dir = TempDir::new().unwrap();

    let missing = GridlinkConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));

    let broken = temp_dir.path().join("broken.toml");
    fs::write(&broken, "[scheduler]\npoll_interval_ms = \"soon\"\n").unwrap();
    let error = GridlinkConfig::load_from(&broken).unwrap_err();
    match error {
        ConfigError::Parse { path, .. } => assert!(path.ends_with("broken.toml")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_inline_configuration() {
    let config = GridlinkConfig::from_toml_str(
        r#"
        [dispatch]
        require_complete_registry = false

        [paths]
        data_directory = "/var/lib/gridlink"
        "#,
    )
    .unwrap();
    assert!(!config.dispatch.require_complete_registry);
    assert_eq!(
        config.data_directory(),
        std::path::PathBuf::from("/var/lib/gridlink")
    );
}
