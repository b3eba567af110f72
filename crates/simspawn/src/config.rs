//! Bridge configuration
//!
//! Where the rosbridge endpoint lives and which Gazebo services it forwards
//! to. Loadable from a JSON file; every field has a default so a partial file
//! is enough.

use crate::error::{Result, SpawnerError};
use serde::{Deserialize, Serialize};
use simspawn_core::{DEFAULT_REFERENCE_FRAME, DescriptionFormat};
use std::path::Path;
use std::time::Duration;

/// Default rosbridge WebSocket endpoint
pub const DEFAULT_BRIDGE_URL: &str = "ws://localhost:9090";

/// Node name the session registers under
pub const DEFAULT_NODE_NAME: &str = "drone_flight_simulator";

/// rosbridge connection and service layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// WebSocket URL of the rosbridge server
    #[serde(default = "default_url")]
    pub url: String,

    /// Participant name used to tag outgoing calls
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Service spawning URDF descriptions
    #[serde(default = "default_spawn_urdf_service")]
    pub spawn_urdf_service: String,

    /// Service spawning SDF descriptions
    #[serde(default = "default_spawn_sdf_service")]
    pub spawn_sdf_service: String,

    /// Service deleting models
    #[serde(default = "default_delete_service")]
    pub delete_service: String,

    /// Frame spawned poses are expressed in
    #[serde(default = "default_reference_frame")]
    pub reference_frame: String,

    /// Per-call timeout (seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

fn default_url() -> String {
    DEFAULT_BRIDGE_URL.to_string()
}

fn default_node_name() -> String {
    DEFAULT_NODE_NAME.to_string()
}

fn default_spawn_urdf_service() -> String {
    "/gazebo/spawn_urdf_model".to_string()
}

fn default_spawn_sdf_service() -> String {
    "/gazebo/spawn_sdf_model".to_string()
}

fn default_delete_service() -> String {
    "/gazebo/delete_model".to_string()
}

fn default_reference_frame() -> String {
    DEFAULT_REFERENCE_FRAME.to_string()
}

fn default_call_timeout_secs() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            node_name: default_node_name(),
            spawn_urdf_service: default_spawn_urdf_service(),
            spawn_sdf_service: default_spawn_sdf_service(),
            delete_service: default_delete_service(),
            reference_frame: default_reference_frame(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

impl BridgeConfig {
    /// Create a config pointing at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set node name
    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    /// Set reference frame
    pub fn with_reference_frame(mut self, frame: impl Into<String>) -> Self {
        self.reference_frame = frame.into();
        self
    }

    /// Set per-call timeout, rounded up to whole seconds
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Spawn service matching a description dialect
    pub fn spawn_service(&self, format: DescriptionFormat) -> &str {
        match format {
            DescriptionFormat::Urdf => &self.spawn_urdf_service,
            DescriptionFormat::Sdf => &self.spawn_sdf_service,
        }
    }

    /// Reject configs that cannot work
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(SpawnerError::config(format!(
                "bridge url must be ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.node_name.trim().is_empty() {
            return Err(SpawnerError::config("node name must not be empty"));
        }
        if self.call_timeout_secs == 0 {
            return Err(SpawnerError::config("call timeout must be at least 1s"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_config_default() {
        let config = BridgeConfig::default();
        assert_eq!(config.url, "ws://localhost:9090");
        assert_eq!(config.node_name, "drone_flight_simulator");
        assert_eq!(config.reference_frame, "world");
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"url": "ws://sim-host:9090", "call_timeout_secs": 5}"#)
                .unwrap();

        assert_eq!(config.url, "ws://sim-host:9090");
        assert_eq!(config.call_timeout_secs, 5);
        assert_eq!(config.delete_service, "/gazebo/delete_model");
    }

    #[test]
    fn test_spawn_service_by_format() {
        let config = BridgeConfig::default();
        assert_eq!(
            config.spawn_service(DescriptionFormat::Urdf),
            "/gazebo/spawn_urdf_model"
        );
        assert_eq!(
            config.spawn_service(DescriptionFormat::Sdf),
            "/gazebo/spawn_sdf_model"
        );
    }

    #[test]
    fn test_validate_rejects_http_url() {
        let config = BridgeConfig::new("http://localhost:9090");
        assert!(matches!(config.validate(), Err(SpawnerError::Config(_))));

        let config = BridgeConfig::default().with_call_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_call_timeout_rounds_up() {
        let config = BridgeConfig::default().with_call_timeout(Duration::from_millis(10));
        assert_eq!(config.call_timeout_secs, 1);
        assert!(config.validate().is_ok());

        let config = BridgeConfig::default().with_call_timeout(Duration::from_millis(2500));
        assert_eq!(config.call_timeout(), Duration::from_secs(3));

        let config = BridgeConfig::default().with_call_timeout(Duration::from_secs(4));
        assert_eq!(config.call_timeout_secs, 4);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{"node_name": "spawner", "reference_frame": "map"}"#).unwrap();

        let config = BridgeConfig::from_file(&path).unwrap();

        assert_eq!(config.node_name, "spawner");
        assert_eq!(config.reference_frame, "map");
        assert_eq!(config.url, DEFAULT_BRIDGE_URL);
    }
}
