//! Key resolver.
//!
//! Keys are looked up by stream id in a fixed table. Sheets without an entry
//! are keyed by their row marker and replicate FULL_TABLE.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::ClassificationError, scan::ROW_MARKER_COLUMN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeySpec {
    pub primary_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replication_keys: Vec<String>,
}

impl KeySpec {
    pub fn new(primary_keys: &[&str], replication_keys: &[&str]) -> Self {
        KeySpec {
            primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            replication_keys: replication_keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn sheet_default() -> Self {
        KeySpec::new(&[ROW_MARKER_COLUMN], &[])
    }
}

/// Stream id → key columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    entries: BTreeMap<String, KeySpec>,
}

impl KeyMap {
    pub fn new() -> Self {
        KeyMap::default()
    }

    pub fn insert(&mut self, stream: impl Into<String>, spec: KeySpec) {
        self.entries.insert(stream.into(), spec);
    }

    /// Entries from `other` replace entries for the same stream.
    pub fn merge(&mut self, other: KeyMap) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, stream: &str) -> Option<&KeySpec> {
        self.entries.get(stream)
    }

    pub fn spec_for(&self, stream: &str) -> KeySpec {
        self.get(stream).cloned().unwrap_or_else(KeySpec::sheet_default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub stream: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(stream: &str, field: &str) -> Self {
        FieldRef {
            stream: stream.to_string(),
            field: field.to_string(),
        }
    }
}

/// Known defects the catalog reproduces on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleratedDeviations {
    /// Replication keys that are left out of automatic inclusion (TDL-14241).
    pub non_automatic_replication_keys: Vec<FieldRef>,
    /// Streams whose unsupported fields are not compared against expectations (TDL-14475).
    pub unsupported_exempt_streams: Vec<String>,
}

impl Default for ToleratedDeviations {
    fn default() -> Self {
        ToleratedDeviations {
            non_automatic_replication_keys: vec![FieldRef::new("file_metadata", "modifiedTime")],
            unsupported_exempt_streams: vec!["Item Master".to_string()],
        }
    }
}

impl ToleratedDeviations {
    pub fn none() -> Self {
        ToleratedDeviations {
            non_automatic_replication_keys: Vec::new(),
            unsupported_exempt_streams: Vec::new(),
        }
    }

    pub fn replication_key_is_automatic(&self, stream: &str, field: &str) -> bool {
        !self
            .non_automatic_replication_keys
            .iter()
            .any(|entry| entry.stream == stream && entry.field == field)
    }

    pub fn unsupported_exempt(&self, stream: &str) -> bool {
        self.unsupported_exempt_streams.iter().any(|s| s == stream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub primary_keys: Vec<String>,
    pub replication_keys: Vec<String>,
    automatic: BTreeSet<String>,
}

impl ResolvedKeys {
    /// Whether the classifier must force `field` to automatic inclusion.
    pub fn forces_automatic(&self, field: &str) -> bool {
        self.automatic.contains(field)
    }
}

pub fn resolve_keys<S: AsRef<str>>(
    stream: &str,
    columns: &[S],
    keys: &KeyMap,
    deviations: &ToleratedDeviations,
) -> Result<ResolvedKeys, ClassificationError> {
    let spec = keys.spec_for(stream);
    if spec.primary_keys.is_empty() {
        return Err(ClassificationError::EmptyPrimaryKey {
            stream: stream.to_string(),
        });
    }
    if spec.replication_keys.len() > 1 {
        return Err(ClassificationError::TooManyReplicationKeys {
            stream: stream.to_string(),
            count: spec.replication_keys.len(),
        });
    }

    for key in spec.primary_keys.iter().chain(&spec.replication_keys) {
        if !columns.iter().any(|column| column.as_ref() == key) {
            return Err(ClassificationError::MissingKeyColumn {
                stream: stream.to_string(),
                key: key.clone(),
            });
        }
    }

    let mut automatic: BTreeSet<String> = spec.primary_keys.iter().cloned().collect();
    for key in &spec.replication_keys {
        if deviations.replication_key_is_automatic(stream, key) {
            automatic.insert(key.clone());
        } else {
            debug!("Stream '{stream}': replication key '{key}' left out of automatic inclusion");
        }
    }

    Ok(ResolvedKeys {
        primary_keys: spec.primary_keys,
        replication_keys: spec.replication_keys,
        automatic,
    })
}
