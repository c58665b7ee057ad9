//! Node configuration types
//!
//! Loaded from an optional TOML file layered under `TIPSET__*` environment
//! variables, e.g. `TIPSET__EVENT_CREATION__MAX_CREATION_RATE=5`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tipset_core::{AncientMode, NodeId};
use tipset_creator::EventCreationConfig;

/// Complete node configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identity
    #[serde(default)]
    pub node: NodeSettings,

    /// Event creation tunables
    #[serde(default)]
    pub event_creation: EventCreationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NodeConfig {
    /// Layer the file at `path` (if any, and if it exists) and the
    /// environment over the defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TIPSET")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to read configuration")?;
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }

    /// Render as TOML, e.g. to write a template file
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Basic node settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSettings {
    /// This node's id in the roster
    #[serde(default)]
    pub self_id: NodeId,

    /// Node name, used in logs only
    #[serde(default = "default_node_name")]
    pub name: String,

    /// Which event property decides ancientness
    #[serde(default)]
    pub ancient_mode: AncientMode,
}

fn default_node_name() -> String {
    "tipset-node".to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            self_id: NodeId::default(),
            name: default_node_name(),
            ancient_mode: AncientMode::default(),
        }
    }
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
