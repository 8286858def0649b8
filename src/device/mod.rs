//! Device access for the installer.
//!
//! The actual serial transport (Web-Serial-style SCP link) is an external
//! collaborator; everything here talks to it through the [`DeviceLink`]
//! trait so the installer flow, the schema migration and the tests never
//! depend on a concrete wire implementation. [`SimulatedLink`] is the
//! in-memory implementation the binary ships with.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub mod schema;

use schema::DeviceConfig;

/// Reserved read-only fields every firmware exposes.
pub const FIELD_FIRMWARE_VERSION: &str = "version";
pub const FIELD_CONFIG_VERSION: &str = "configVersion";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device is not connected")]
    NotConnected,

    #[error("device has no field \"{0}\"")]
    UnknownField(String),

    #[error("device reported \"{field}\" = \"{value}\", which is not a number")]
    MalformedField { field: String, value: String },

    #[error("connecting to the device failed: {0}")]
    ConnectFailed(String),

    #[error("firmware installation failed: {0}")]
    InstallFailed(String),
}

/// Everything the installer needs from a connected device.
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Open the link. Idempotent; reconnecting an open link succeeds.
    async fn connect(&self) -> Result<(), DeviceError>;

    /// Read a single named field from the device.
    async fn read_field(&self, field: &str) -> Result<String, DeviceError>;

    /// Write a single named field to the device.
    async fn write_field(&self, field: &str, value: &str) -> Result<(), DeviceError>;

    /// Flash the given firmware version and bring the link back up.
    async fn install_firmware(&self, version: &str) -> Result<(), DeviceError>;
}

/// Snapshot of a device as read over the link.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub firmware_version: String,
    pub config_version: u32,
    pub config: DeviceConfig,
}

/// Read firmware version, config version and the full configuration for
/// that version from the device.
pub async fn load_device_info(link: &dyn DeviceLink) -> anyhow::Result<DeviceInfo> {
    let firmware_version = link.read_field(FIELD_FIRMWARE_VERSION).await?;
    let raw_config_version = link.read_field(FIELD_CONFIG_VERSION).await?;
    let config_version: u32 =
        raw_config_version
            .trim()
            .parse()
            .map_err(|_| DeviceError::MalformedField {
                field: FIELD_CONFIG_VERSION.to_string(),
                value: raw_config_version,
            })?;

    let schema = schema::for_version(config_version)
        .ok_or(schema::SchemaError::UnknownVersion(config_version))?;
    let config = schema.load(link).await?;

    tracing::info!(
        firmware = %firmware_version,
        config_version,
        "loaded device info"
    );

    Ok(DeviceInfo {
        firmware_version,
        config_version,
        config,
    })
}

/// Write every field of `config` to the device.
pub async fn write_configuration(
    link: &dyn DeviceLink,
    config: &DeviceConfig,
) -> Result<(), DeviceError> {
    for (field, value) in config.iter() {
        link.write_field(field, value).await?;
    }
    Ok(())
}

/// In-memory device used when no serial backend is wired up, and by the
/// installer tests. Behaves like a freshly flashed sensor: reports a
/// firmware and config version and stores field writes.
pub struct SimulatedLink {
    inner: Mutex<SimulatedState>,
}

struct SimulatedState {
    connected: bool,
    fields: BTreeMap<String, String>,
    /// When set, the next connect fails once with this message.
    fail_connect: Option<String>,
    /// When set, every install fails with this message.
    fail_install: Option<String>,
    installed: Vec<String>,
}

impl SimulatedLink {
    /// A device running firmware 0.0.1 with an empty v1 configuration.
    pub fn factory_fresh() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_FIRMWARE_VERSION.to_string(), "0.0.1".to_string());
        fields.insert(FIELD_CONFIG_VERSION.to_string(), "1".to_string());
        for field in schema::latest().fields() {
            fields.insert((*field).to_string(), String::new());
        }

        Self {
            inner: Mutex::new(SimulatedState {
                connected: false,
                fields,
                fail_connect: None,
                fail_install: None,
                installed: Vec::new(),
            }),
        }
    }

    /// Make the next `connect` fail once. Failure injection for tests.
    #[allow(dead_code)]
    pub fn fail_next_connect(&self, message: impl Into<String>) {
        self.inner.lock().unwrap().fail_connect = Some(message.into());
    }

    /// Make every install fail. Failure injection for tests.
    #[allow(dead_code)]
    pub fn fail_installs(&self, message: impl Into<String>) {
        self.inner.lock().unwrap().fail_install = Some(message.into());
    }

    #[allow(dead_code)]
    pub fn set_field(&self, field: &str, value: &str) {
        self.inner
            .lock()
            .unwrap()
            .fields
            .insert(field.to_string(), value.to_string());
    }

    #[allow(dead_code)]
    pub fn field(&self, field: &str) -> Option<String> {
        self.inner.lock().unwrap().fields.get(field).cloned()
    }

    #[allow(dead_code)]
    pub fn installed_versions(&self) -> Vec<String> {
        self.inner.lock().unwrap().installed.clone()
    }
}

#[async_trait]
impl DeviceLink for SimulatedLink {
    async fn connect(&self) -> Result<(), DeviceError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(message) = state.fail_connect.take() {
            return Err(DeviceError::ConnectFailed(message));
        }
        state.connected = true;
        Ok(())
    }

    async fn read_field(&self, field: &str) -> Result<String, DeviceError> {
        let state = self.inner.lock().unwrap();
        if !state.connected {
            return Err(DeviceError::NotConnected);
        }
        state
            .fields
            .get(field)
            .cloned()
            .ok_or_else(|| DeviceError::UnknownField(field.to_string()))
    }

    async fn write_field(&self, field: &str, value: &str) -> Result<(), DeviceError> {
        let mut state = self.inner.lock().unwrap();
        if !state.connected {
            return Err(DeviceError::NotConnected);
        }
        state.fields.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn install_firmware(&self, version: &str) -> Result<(), DeviceError> {
        let mut state = self.inner.lock().unwrap();
        if !state.connected {
            return Err(DeviceError::NotConnected);
        }
        if let Some(message) = &state.fail_install {
            return Err(DeviceError::InstallFailed(message.clone()));
        }
        state
            .fields
            .insert(FIELD_FIRMWARE_VERSION.to_string(), version.to_string());
        state.installed.push(version.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_link_requires_connect() {
        let link = SimulatedLink::factory_fresh();
        assert!(matches!(
            link.read_field(FIELD_FIRMWARE_VERSION).await,
            Err(DeviceError::NotConnected)
        ));

        link.connect().await.unwrap();
        assert_eq!(
            link.read_field(FIELD_FIRMWARE_VERSION).await.unwrap(),
            "0.0.1"
        );
    }

    #[tokio::test]
    async fn connect_failure_is_one_shot() {
        let link = SimulatedLink::factory_fresh();
        link.fail_next_connect("port busy");

        assert!(matches!(
            link.connect().await,
            Err(DeviceError::ConnectFailed(_))
        ));
        link.connect().await.unwrap();
    }

    #[tokio::test]
    async fn load_device_info_reads_version_and_config() {
        let link = SimulatedLink::factory_fresh();
        link.connect().await.unwrap();
        link.set_field("devEUI", "0011223344556677");

        let info = load_device_info(&link).await.unwrap();
        assert_eq!(info.firmware_version, "0.0.1");
        assert_eq!(info.config_version, 1);
        assert_eq!(info.config.get("devEUI"), Some("0011223344556677"));
    }

    #[tokio::test]
    async fn load_device_info_rejects_garbage_config_version() {
        let link = SimulatedLink::factory_fresh();
        link.connect().await.unwrap();
        link.set_field(FIELD_CONFIG_VERSION, "banana");

        let err = load_device_info(&link).await.unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[tokio::test]
    async fn load_device_info_rejects_unknown_config_version() {
        let link = SimulatedLink::factory_fresh();
        link.connect().await.unwrap();
        link.set_field(FIELD_CONFIG_VERSION, "99");

        let err = load_device_info(&link).await.unwrap_err();
        assert!(err.to_string().contains("99"));
    }

    #[tokio::test]
    async fn write_configuration_pushes_every_field() {
        let link = SimulatedLink::factory_fresh();
        link.connect().await.unwrap();

        let mut config = schema::latest().defaults();
        config.set("appEUI", "aa");
        config.set("appKey", "bb");
        config.set("devEUI", "cc");
        write_configuration(&link, &config).await.unwrap();

        assert_eq!(link.field("appEUI").as_deref(), Some("aa"));
        assert_eq!(link.field("appKey").as_deref(), Some("bb"));
        assert_eq!(link.field("devEUI").as_deref(), Some("cc"));
    }

    #[tokio::test]
    async fn install_updates_reported_firmware_version() {
        let link = SimulatedLink::factory_fresh();
        link.connect().await.unwrap();
        link.install_firmware("0.0.2").await.unwrap();

        assert_eq!(
            link.read_field(FIELD_FIRMWARE_VERSION).await.unwrap(),
            "0.0.2"
        );
        assert_eq!(link.installed_versions(), vec!["0.0.2".to_string()]);
    }
}
