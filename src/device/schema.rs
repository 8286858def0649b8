//! Versioned device configuration.
//!
//! Each firmware generation speaks one config schema version; the device
//! reports which one via the `configVersion` field. Newer installers must
//! still understand older devices, so every schema after the first knows
//! how to lift a config from its predecessor and [`migrate`] walks that
//! chain in memory before anything is written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DeviceError, DeviceInfo, DeviceLink};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown config version {0}, no loader implemented")]
    UnknownVersion(u32),

    #[error("no upgrade path from config v{from} to v{to}")]
    NoUpgradePath { from: u32, to: u32 },
}

/// Field→value map holding one device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig(BTreeMap<String, String>);

impl DeviceConfig {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether every field the schema requires is present and non-empty.
    pub fn is_complete_for(&self, schema: &ConfigSchema) -> bool {
        schema
            .fields
            .iter()
            .all(|field| self.get(field).is_some_and(|value| !value.is_empty()))
    }
}

type UpgradeFn = fn(DeviceConfig) -> DeviceConfig;

/// One known config schema version.
pub struct ConfigSchema {
    version: u32,
    fields: &'static [&'static str],
    /// Lifts a config of the previous version into this one. `None` for
    /// the base version.
    upgrade: Option<UpgradeFn>,
}

impl ConfigSchema {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// All fields present with empty values.
    pub fn defaults(&self) -> DeviceConfig {
        let mut config = DeviceConfig::default();
        for field in self.fields {
            config.set(field, "");
        }
        config
    }

    /// Read every field of this schema from the device.
    pub async fn load(&self, link: &dyn DeviceLink) -> Result<DeviceConfig, DeviceError> {
        let mut config = DeviceConfig::default();
        for field in self.fields {
            let value = link.read_field(field).await?;
            config.set(field, value);
        }
        Ok(config)
    }
}

/// v1: LoRaWAN OTAA credentials.
pub static CONFIG_VERSIONS: &[ConfigSchema] = &[ConfigSchema {
    version: 1,
    fields: &["appEUI", "appKey", "devEUI"],
    upgrade: None,
}];

pub fn for_version(version: u32) -> Option<&'static ConfigSchema> {
    CONFIG_VERSIONS.iter().find(|s| s.version == version)
}

pub fn latest() -> &'static ConfigSchema {
    // CONFIG_VERSIONS is a non-empty static.
    &CONFIG_VERSIONS[CONFIG_VERSIONS.len() - 1]
}

/// Upgrade `info` in place until its config version reaches `desired`.
/// A no-op when the device is already at or past `desired`.
pub fn migrate(info: &mut DeviceInfo, desired: u32) -> Result<(), SchemaError> {
    while info.config_version < desired {
        let next = info.config_version + 1;
        let schema = for_version(next).ok_or(SchemaError::NoUpgradePath {
            from: info.config_version,
            to: next,
        })?;
        let upgrade = schema.upgrade.ok_or(SchemaError::NoUpgradePath {
            from: info.config_version,
            to: next,
        })?;

        tracing::debug!(from = info.config_version, to = next, "upgrading config");
        info.config = upgrade(std::mem::take(&mut info.config));
        info.config_version = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_info(config_version: u32) -> DeviceInfo {
        DeviceInfo {
            firmware_version: "0.0.1".to_string(),
            config_version,
            config: latest().defaults(),
        }
    }

    #[test]
    fn v1_is_the_latest_known_schema() {
        assert_eq!(latest().version(), 1);
        assert_eq!(latest().fields(), &["appEUI", "appKey", "devEUI"]);
        assert!(for_version(1).is_some());
        assert!(for_version(2).is_none());
    }

    #[test]
    fn defaults_are_empty_but_present() {
        let config = latest().defaults();
        for field in latest().fields() {
            assert_eq!(config.get(field), Some(""));
        }
        assert!(!config.is_complete_for(latest()));
    }

    #[test]
    fn completeness_requires_every_field_non_empty() {
        let mut config = latest().defaults();
        config.set("appEUI", "0000000000000000");
        config.set("appKey", "00000000000000000000000000000000");
        assert!(!config.is_complete_for(latest()));

        config.set("devEUI", "0011223344556677");
        assert!(config.is_complete_for(latest()));
    }

    #[test]
    fn migrate_is_a_noop_at_the_current_version() {
        let mut info = v1_info(1);
        let before = info.config.clone();
        migrate(&mut info, 1).unwrap();
        assert_eq!(info.config_version, 1);
        assert_eq!(info.config, before);
    }

    #[test]
    fn migrate_past_the_latest_version_fails() {
        let mut info = v1_info(1);
        let err = migrate(&mut info, 2).unwrap_err();
        assert_eq!(err, SchemaError::NoUpgradePath { from: 1, to: 2 });
        // Failed migration leaves the version untouched.
        assert_eq!(info.config_version, 1);
    }

    #[test]
    fn migrate_from_unknown_older_version_fails() {
        let mut info = v1_info(0);
        // There is no v0→v1 upgrade; v1 is the base.
        let err = migrate(&mut info, 1).unwrap_err();
        assert_eq!(err, SchemaError::NoUpgradePath { from: 0, to: 1 });
    }
}
