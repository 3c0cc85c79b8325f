//! YAML configuration for a discovery run.
//!
//! ```yaml
//! threads: 4
//! include_metadata_streams: true
//! classifier:
//!   sample_rows: 0
//!   empty_columns: unsupported
//! keys:
//!   Orders:
//!     primary_keys: [order_id]
//!     replication_keys: [updated_at]
//! deviations:
//!   non_automatic_replication_keys:
//!     - { stream: file_metadata, field: modifiedTime }
//!   unsupported_exempt_streams: ["Item Master"]
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    classify::ClassifierConfig,
    keys::{KeyMap, ToleratedDeviations},
    streams,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Worker threads; 0 uses one per CPU.
    pub threads: usize,
    pub include_metadata_streams: bool,
    pub classifier: ClassifierConfig,
    /// Overrides and additions to the built-in key table.
    pub keys: KeyMap,
    pub deviations: ToleratedDeviations,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            threads: 0,
            include_metadata_streams: true,
            classifier: ClassifierConfig::default(),
            keys: KeyMap::new(),
            deviations: ToleratedDeviations::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Reading config file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing config file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(DiscoveryConfig::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Built-in keys for the fixed streams, then the configured entries.
    pub fn key_map(&self) -> KeyMap {
        let mut keys = streams::builtin_keys();
        keys.merge(self.keys.clone());
        keys
    }
}
