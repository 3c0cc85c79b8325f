//! Contract checks for a finished catalog.
//!
//! Expectations name, per stream, the keys, the replication method and the
//! automatic and unsupported field sets a consumer relies on. Known defects
//! are consulted from [`ToleratedDeviations`] rather than baked into the
//! expectations, so each exception stays visible.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Catalog, CatalogEntry},
    classify::Inclusion,
    keys::ToleratedDeviations,
    replication::{ReplicationMethod, select_method},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedStream {
    pub primary_keys: BTreeSet<String>,
    #[serde(default)]
    pub replication_keys: BTreeSet<String>,
    pub replication_method: ReplicationMethod,
    #[serde(default)]
    pub automatic_fields: BTreeSet<String>,
    #[serde(default)]
    pub unsupported_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    pub streams: BTreeMap<String, ExpectedStream>,
}

impl Expectations {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading expectations {path:?}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Parsing expectations {path:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    StreamCount,
    StreamPresent,
    TopLevelBreadcrumb,
    ReplicationKeys,
    PrimaryKeys,
    ReplicationMethod,
    MethodMatchesKeys,
    AutomaticFields,
    UnsupportedFields,
    AvailableFields,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Check::StreamCount => "stream count",
            Check::StreamPresent => "stream present",
            Check::TopLevelBreadcrumb => "top-level breadcrumb",
            Check::ReplicationKeys => "replication keys",
            Check::PrimaryKeys => "primary keys",
            Check::ReplicationMethod => "replication method",
            Check::MethodMatchesKeys => "method matches keys",
            Check::AutomaticFields => "automatic fields",
            Check::UnsupportedFields => "unsupported fields",
            Check::AvailableFields => "available fields",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    pub stream: Option<String>,
    pub check: Check,
    pub detail: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stream {
            Some(stream) => write!(f, "[{stream}] {}: {}", self.check, self.detail),
            None => write!(f, "{}: {}", self.check, self.detail),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub streams_checked: usize,
    pub violations: Vec<ContractViolation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations_for(&self, check: Check) -> impl Iterator<Item = &ContractViolation> {
        self.violations.iter().filter(move |v| v.check == check)
    }

    fn push(&mut self, stream: Option<&str>, check: Check, detail: String) {
        self.violations.push(ContractViolation {
            stream: stream.map(str::to_string),
            check,
            detail,
        });
    }

    fn expect_sets(
        &mut self,
        stream: &str,
        check: Check,
        expected: &BTreeSet<String>,
        actual: &BTreeSet<String>,
    ) {
        if expected != actual {
            self.push(
                Some(stream),
                check,
                format!("expected {expected:?}, found {actual:?}"),
            );
        }
    }
}

fn owned(fields: BTreeSet<&str>) -> BTreeSet<String> {
    fields.into_iter().map(str::to_string).collect()
}

pub fn validate_catalog(
    catalog: &Catalog,
    expectations: &Expectations,
    deviations: &ToleratedDeviations,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if expectations.streams.len() != catalog.streams.len() {
        report.push(
            None,
            Check::StreamCount,
            format!(
                "expected {} stream(s), found {}",
                expectations.streams.len(),
                catalog.streams.len()
            ),
        );
    }

    for (name, expected) in &expectations.streams {
        match catalog.streams.iter().find(|entry| &entry.stream_name == name) {
            Some(entry) => {
                report.streams_checked += 1;
                check_stream(&mut report, name, entry, expected, deviations);
            }
            None => report.push(
                Some(name),
                Check::StreamPresent,
                "no catalog entry with this stream name".to_string(),
            ),
        }
    }
    report
}

fn check_stream(
    report: &mut ValidationReport,
    stream: &str,
    entry: &CatalogEntry,
    expected: &ExpectedStream,
    deviations: &ToleratedDeviations,
) {
    let top_level = entry.metadata.iter().filter(|m| m.is_stream_level()).count();
    if top_level != 1 {
        report.push(
            Some(stream),
            Check::TopLevelBreadcrumb,
            format!("found {top_level} stream-level metadata record(s)"),
        );
    }

    let actual_replication: BTreeSet<String> = entry.replication_keys().into_iter().collect();
    let actual_primary: BTreeSet<String> = entry.primary_keys().into_iter().collect();
    report.expect_sets(
        stream,
        Check::ReplicationKeys,
        &expected.replication_keys,
        &actual_replication,
    );
    report.expect_sets(stream, Check::PrimaryKeys, &expected.primary_keys, &actual_primary);

    let actual_method = entry.replication_method();
    if actual_method != Some(expected.replication_method) {
        report.push(
            Some(stream),
            Check::ReplicationMethod,
            format!(
                "expected {}, found {}",
                expected.replication_method,
                actual_method.map(|m| m.to_string()).unwrap_or_else(|| "none".to_string())
            ),
        );
    }
    let implied = select_method(&expected.replication_keys.iter().collect::<Vec<_>>());
    if actual_method != Some(implied) {
        report.push(
            Some(stream),
            Check::MethodMatchesKeys,
            format!("replication keys {:?} imply {implied}", expected.replication_keys),
        );
    }

    let mut expected_automatic = expected.automatic_fields.clone();
    expected_automatic.retain(|field| {
        !expected.replication_keys.contains(field)
            || deviations.replication_key_is_automatic(stream, field)
    });
    report.expect_sets(
        stream,
        Check::AutomaticFields,
        &expected_automatic,
        &owned(entry.fields_with(Inclusion::Automatic)),
    );

    if !deviations.unsupported_exempt(stream) {
        report.expect_sets(
            stream,
            Check::UnsupportedFields,
            &expected.unsupported_fields,
            &owned(entry.fields_with(Inclusion::Unsupported)),
        );
    }

    for item in entry.metadata.iter().filter(|m| !m.is_stream_level()) {
        let Some(field) = item.field() else {
            continue;
        };
        if expected_automatic.contains(field) || expected.unsupported_fields.contains(field) {
            continue;
        }
        if item.metadata.inclusion != Inclusion::Available {
            report.push(
                Some(stream),
                Check::AvailableFields,
                format!("field '{field}' is {}", item.metadata.inclusion),
            );
        }
    }
}
