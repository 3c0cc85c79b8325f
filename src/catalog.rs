//! Catalog model and the assembler that turns resolved columns into one entry.
//!
//! Every entry carries one stream-level metadata record (empty breadcrumb)
//! and one record per declared property (`["properties", name]`). Anything
//! else is rejected before it can reach a catalog.

use std::{collections::BTreeSet, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{
    classify::Inclusion,
    error::CatalogIntegrityError,
    io_utils,
    keys::ResolvedKeys,
    replication::{ReplicationMethod, select_method},
    schema::object_schema,
};

const PROPERTIES: &str = "properties";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = io_utils::open_input(path)?;
        serde_json::from_reader(reader).with_context(|| format!("Parsing catalog {path:?}"))
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        io_utils::write_json(path, self).context("Writing catalog JSON")
    }

    /// SHA-256 over the compact JSON form with object keys sorted. Array
    /// order (streams, metadata, key lists) still counts.
    pub fn fingerprint(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("Serializing catalog")?;
        let bytes = serde_json::to_vec(&sorted_keys(&value)).context("Serializing catalog")?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(key, item)| (key.clone(), sorted_keys(item)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub stream_name: String,
    pub key_properties: Vec<String>,
    pub schema: Value,
    pub metadata: Vec<MetadataEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: Metadata,
}

impl MetadataEntry {
    pub fn is_stream_level(&self) -> bool {
        self.breadcrumb.is_empty()
    }

    /// Property name for a `["properties", name]` breadcrumb.
    pub fn field(&self) -> Option<&str> {
        match self.breadcrumb.as_slice() {
            [kind, name] if kind == PROPERTIES => Some(name.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_key_properties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_replication_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<ReplicationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_replication_method: Option<ReplicationMethod>,
    pub inclusion: Inclusion,
}

impl Metadata {
    fn field(inclusion: Inclusion) -> Self {
        Metadata {
            table_key_properties: None,
            valid_replication_keys: None,
            replication_key: None,
            replication_method: None,
            forced_replication_method: None,
            inclusion,
        }
    }
}

/// One resolved column ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub inclusion: Inclusion,
    pub schema: Value,
}

impl CatalogEntry {
    pub fn stream_metadata(&self) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|entry| entry.is_stream_level())
            .map(|entry| &entry.metadata)
    }

    pub fn field_metadata(&self, field: &str) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|entry| entry.field() == Some(field))
            .map(|entry| &entry.metadata)
    }

    pub fn primary_keys(&self) -> Vec<String> {
        self.stream_metadata()
            .and_then(|md| md.table_key_properties.clone())
            .unwrap_or_default()
    }

    pub fn replication_keys(&self) -> Vec<String> {
        self.stream_metadata()
            .and_then(|md| md.valid_replication_keys.clone())
            .unwrap_or_default()
    }

    pub fn replication_method(&self) -> Option<ReplicationMethod> {
        self.stream_metadata().and_then(|md| md.replication_method)
    }

    /// Property names in schema order.
    pub fn declared_fields(&self) -> Vec<&str> {
        self.schema
            .get(PROPERTIES)
            .and_then(Value::as_object)
            .map(|properties| properties.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn fields_with(&self, inclusion: Inclusion) -> BTreeSet<&str> {
        self.metadata
            .iter()
            .filter(|entry| entry.metadata.inclusion == inclusion)
            .filter_map(MetadataEntry::field)
            .collect()
    }

    /// Structural checks that hold for every valid entry.
    pub fn verify(&self) -> Result<(), CatalogIntegrityError> {
        let stream = &self.tap_stream_id;
        let stream_level = self.metadata.iter().filter(|e| e.is_stream_level()).count();
        if stream_level != 1 {
            return Err(CatalogIntegrityError::StreamBreadcrumbCount {
                stream: stream.clone(),
                count: stream_level,
            });
        }

        let declared = self.declared_fields();
        let mut counts = Vec::with_capacity(self.metadata.len());
        for entry in self.metadata.iter().filter(|e| !e.is_stream_level()) {
            let Some(field) = entry.field() else {
                return Err(CatalogIntegrityError::MalformedBreadcrumb {
                    stream: stream.clone(),
                    breadcrumb: entry.breadcrumb.clone(),
                });
            };
            if !declared.contains(&field) {
                return Err(CatalogIntegrityError::UndeclaredField {
                    stream: stream.clone(),
                    field: field.to_string(),
                });
            }
            counts.push(field);
        }
        let counts = counts.into_iter().counts();
        for field in &declared {
            let count = counts.get(field).copied().unwrap_or(0);
            if count != 1 {
                return Err(CatalogIntegrityError::FieldBreadcrumbCount {
                    stream: stream.clone(),
                    field: field.to_string(),
                    count,
                });
            }
        }

        let replication_keys = self.replication_keys();
        let method = self.replication_method();
        if method != Some(select_method(&replication_keys)) {
            return Err(CatalogIntegrityError::MethodMismatch {
                stream: stream.clone(),
                method: method.map(|m| m.to_string()).unwrap_or_default(),
                keys: replication_keys,
            });
        }
        Ok(())
    }
}

pub fn assemble(
    stream: &str,
    fields: Vec<FieldSpec>,
    keys: &ResolvedKeys,
    method: ReplicationMethod,
) -> Result<CatalogEntry, CatalogIntegrityError> {
    for field in &fields {
        if keys.forces_automatic(&field.name) && field.inclusion != Inclusion::Automatic {
            return Err(CatalogIntegrityError::KeyNotAutomatic {
                stream: stream.to_string(),
                key: field.name.clone(),
                inclusion: field.inclusion.to_string(),
            });
        }
    }

    let replication_keys = (!keys.replication_keys.is_empty()).then(|| keys.replication_keys.clone());
    let mut metadata = Vec::with_capacity(fields.len() + 1);
    metadata.push(MetadataEntry {
        breadcrumb: Vec::new(),
        metadata: Metadata {
            table_key_properties: Some(keys.primary_keys.clone()),
            replication_key: keys.replication_keys.first().cloned(),
            valid_replication_keys: replication_keys,
            replication_method: Some(method),
            forced_replication_method: Some(method),
            inclusion: Inclusion::Available,
        },
    });

    let mut properties = Map::new();
    for field in fields {
        metadata.push(MetadataEntry {
            breadcrumb: vec![PROPERTIES.to_string(), field.name.clone()],
            metadata: Metadata::field(field.inclusion),
        });
        properties.insert(field.name, field.schema);
    }

    let entry = CatalogEntry {
        tap_stream_id: stream.to_string(),
        stream: stream.to_string(),
        stream_name: stream.to_string(),
        key_properties: keys.primary_keys.clone(),
        schema: object_schema(properties),
        metadata,
    };
    entry.verify()?;
    Ok(entry)
}
