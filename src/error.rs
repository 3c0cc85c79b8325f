//! Error taxonomy for discovery.
//!
//! A blank header row is not an error: the scanner returns `None` and the tab
//! is left out of the catalog. Everything below is surfaced to the caller.

use thiserror::Error;

/// A tab could not be read or classified. Aborts that tab's pipeline only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("sheet '{sheet}' could not be read: {reason}")]
    Malformed { sheet: String, reason: String },

    #[error("header '{header}' in sheet '{sheet}' at cell {cell} is a reserved column name")]
    ReservedHeader {
        sheet: String,
        header: String,
        cell: String,
    },

    #[error("duplicate header '{header}' in sheet '{sheet}' at cell {cell}")]
    DuplicateHeader {
        sheet: String,
        header: String,
        cell: String,
    },

    #[error("sheet '{sheet}', column '{column}': cell {cell} holds error value {value} and cannot type the column")]
    ErrorValue {
        sheet: String,
        column: String,
        cell: String,
        value: String,
    },

    #[error("stream '{stream}' declares key '{key}' which is not a column of the sheet")]
    MissingKeyColumn { stream: String, key: String },

    #[error("stream '{stream}' resolved to an empty primary key")]
    EmptyPrimaryKey { stream: String },

    #[error("stream '{stream}' declares {count} replication keys, at most one is allowed")]
    TooManyReplicationKeys { stream: String, count: usize },
}

/// An assembled stream would break the metadata contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogIntegrityError {
    #[error("stream '{stream}' has {count} stream-level metadata records, expected exactly 1")]
    StreamBreadcrumbCount { stream: String, count: usize },

    #[error("stream '{stream}' field '{field}' has {count} metadata records, expected exactly 1")]
    FieldBreadcrumbCount {
        stream: String,
        field: String,
        count: usize,
    },

    #[error("stream '{stream}' has metadata for undeclared field '{field}'")]
    UndeclaredField { stream: String, field: String },

    #[error("stream '{stream}' key '{key}' must be automatic but is {inclusion}")]
    KeyNotAutomatic {
        stream: String,
        key: String,
        inclusion: String,
    },

    #[error("stream '{stream}' replication method {method} does not match replication keys {keys:?}")]
    MethodMismatch {
        stream: String,
        method: String,
        keys: Vec<String>,
    },

    #[error("stream '{stream}' has malformed breadcrumb {breadcrumb:?}")]
    MalformedBreadcrumb {
        stream: String,
        breadcrumb: Vec<String>,
    },
}

/// Failure of one tab's pipeline, or of the whole run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("sheet '{sheet}': {source}")]
    Classification {
        sheet: String,
        #[source]
        source: ClassificationError,
    },

    #[error("sheet '{sheet}': {source}")]
    CatalogIntegrity {
        sheet: String,
        #[source]
        source: CatalogIntegrityError,
    },

    #[error("metadata stream '{stream}': {source}")]
    MetadataStream {
        stream: String,
        #[source]
        source: ClassificationError,
    },

    #[error("metadata stream '{stream}': {source}")]
    MetadataStreamIntegrity {
        stream: String,
        #[source]
        source: CatalogIntegrityError,
    },

    #[error("discovery was cancelled")]
    Cancelled,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl DiscoveryError {
    pub fn sheet(&self) -> Option<&str> {
        match self {
            DiscoveryError::Classification { sheet, .. }
            | DiscoveryError::CatalogIntegrity { sheet, .. } => Some(sheet),
            _ => None,
        }
    }

    /// Fixed metadata stream the failure belongs to.
    pub fn metadata_stream(&self) -> Option<&str> {
        match self {
            DiscoveryError::MetadataStream { stream, .. }
            | DiscoveryError::MetadataStreamIntegrity { stream, .. } => Some(stream),
            _ => None,
        }
    }
}
