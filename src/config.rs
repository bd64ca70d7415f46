//! Configuration for asset synchronization and core discovery.
//!
//! Stored as JSON. Every field except the directories has a default, so a
//! minimal config only names `bundle_dir`, `data_dir` and `cores_dir`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the version stamp inside the data directory.
pub const DEFAULT_STAMP_FILE: &str = ".cacheversion";

/// Files whose name starts with this belong to the host itself.
pub const DEFAULT_RESERVED_PREFIX: &str = "libretroarch";

/// A named top-level tree of bundled resources, extracted as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetGroup {
    pub name: String,
    /// Relative root inside the bundled tree.
    pub source: PathBuf,
    /// Relative root inside the data directory.
    pub target: PathBuf,
}

impl AssetGroup {
    pub fn new(name: &str, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Group whose source and target share one relative path.
    pub fn mirrored(name: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(name, path.clone(), path)
    }
}

pub fn default_groups() -> Vec<AssetGroup> {
    vec![
        AssetGroup::mirrored("shaders", "shaders_glsl"),
        AssetGroup::mirrored("overlays", "overlays"),
    ]
}

/// When the stamp is allowed to advance after an extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampPolicy {
    /// Advance after every group was attempted, failed or not.
    #[default]
    AlwaysAdvance,
    /// Advance only when every group extracted cleanly.
    RequireAllGroups,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub bundle_dir: PathBuf,
    pub data_dir: PathBuf,
    #[serde(default = "default_stamp_file")]
    pub stamp_file: String,
    #[serde(default = "default_groups")]
    pub groups: Vec<AssetGroup>,
    #[serde(default)]
    pub stamp_policy: StampPolicy,
}

impl SyncConfig {
    pub fn new(bundle_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            data_dir: data_dir.into(),
            stamp_file: default_stamp_file(),
            groups: default_groups(),
            stamp_policy: StampPolicy::default(),
        }
    }

    pub fn stamp_path(&self) -> PathBuf {
        self.data_dir.join(&self.stamp_file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub cores_dir: PathBuf,
    /// Key/value descriptor table. Discovery falls back to file names without it.
    #[serde(default)]
    pub descriptor_table: Option<PathBuf>,
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,
    /// Skip NEON builds on hosts without NEON.
    #[serde(default)]
    pub hide_unsupported_variants: bool,
}

impl DiscoveryConfig {
    pub fn new(cores_dir: impl Into<PathBuf>) -> Self {
        Self {
            cores_dir: cores_dir.into(),
            descriptor_table: None,
            reserved_prefix: default_reserved_prefix(),
            hide_unsupported_variants: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub discovery: DiscoveryConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_stamp_file() -> String {
    DEFAULT_STAMP_FILE.to_string()
}

fn default_reserved_prefix() -> String {
    DEFAULT_RESERVED_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_config_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coredepot.json");
        fs::write(
            &path,
            r#"{
                "sync": { "bundle_dir": "/bundle", "data_dir": "/data" },
                "discovery": { "cores_dir": "/cores" }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.sync, SyncConfig::new("/bundle", "/data"));
        assert_eq!(config.discovery, DiscoveryConfig::new("/cores"));
        assert_eq!(config.sync.stamp_path(), PathBuf::from("/data/.cacheversion"));
    }

    #[test]
    fn explicit_policy_and_groups() {
        let config: SyncConfig = serde_json::from_str(
            r#"{
                "bundle_dir": "b",
                "data_dir": "d",
                "stamp_policy": "require_all_groups",
                "groups": [{ "name": "shaders", "source": "shaders", "target": "out/shaders" }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.stamp_policy, StampPolicy::RequireAllGroups);
        assert_eq!(
            config.groups,
            vec![AssetGroup::new("shaders", "shaders", "out/shaders")]
        );
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            AppConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }
}
