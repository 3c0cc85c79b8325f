//! Discovery driver.
//!
//! Every tab runs through scan → key resolution → classification → method
//! selection → assembly on its own. Tabs fan out over a bounded rayon pool;
//! the catalog is only put together after every tab has finished.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    catalog::{Catalog, CatalogEntry, FieldSpec, assemble},
    classify::{Inclusion, classify, profile_column},
    config::DiscoveryConfig,
    error::{ClassificationError, DiscoveryError},
    keys::{KeyMap, resolve_keys},
    replication::select_method,
    scan::scan,
    schema::{infer_column_type, property_schema},
    streams::fixed_streams,
    tab::{Document, Sheet, Tab},
};

/// Shared flag that stops a run from scheduling further tabs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabOutcome {
    Stream(CatalogEntry),
    Skipped,
    Failed(DiscoveryError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    pub catalog: Catalog,
    /// Tabs left out because their header row is blank.
    pub skipped: Vec<String>,
    pub failures: Vec<DiscoveryError>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs one sheet through the whole pipeline. `position` names the sheet
/// when its title cannot be read.
pub fn discover_tab(
    raw: &Sheet,
    position: usize,
    keys: &KeyMap,
    config: &DiscoveryConfig,
) -> TabOutcome {
    match build_tab_entry(raw, position, keys, config) {
        Ok(Some(entry)) => TabOutcome::Stream(entry),
        Ok(None) => TabOutcome::Skipped,
        Err(err) => TabOutcome::Failed(err),
    }
}

fn build_tab_entry(
    raw: &Sheet,
    position: usize,
    keys: &KeyMap,
    config: &DiscoveryConfig,
) -> Result<Option<CatalogEntry>, DiscoveryError> {
    let parsed = raw
        .to_tab(position)
        .map_err(|source| DiscoveryError::Classification {
            sheet: raw.title(position),
            source,
        })?;
    let tab: &Tab = &parsed;
    let sheet = tab.name();
    let classification = |source: ClassificationError| DiscoveryError::Classification {
        sheet: sheet.to_string(),
        source,
    };

    let Some(skeleton) = scan(tab).map_err(classification)? else {
        return Ok(None);
    };
    let column_names = skeleton
        .columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>();
    let resolved = resolve_keys(sheet, &column_names, keys, &config.deviations)
        .map_err(classification)?;

    let mut fields = Vec::with_capacity(skeleton.columns.len());
    for column in &skeleton.columns {
        let profile = profile_column(tab, column, config.classifier.sample_rows);
        let forced = resolved.forces_automatic(&column.name);
        let Some(inclusion) = classify(column, &profile, forced, &config.classifier) else {
            continue;
        };
        let column_type = infer_column_type(sheet, column, &profile).map_err(classification)?;
        debug!(
            "Sheet '{sheet}': column '{}' → {} ({})",
            column.name,
            inclusion,
            column_type.as_str()
        );
        fields.push(FieldSpec {
            name: column.name.clone(),
            inclusion,
            schema: property_schema(column, column_type),
        });
    }

    let method = select_method(&resolved.replication_keys);
    let entry = assemble(sheet, fields, &resolved, method).map_err(|source| {
        DiscoveryError::CatalogIntegrity {
            sheet: sheet.to_string(),
            source,
        }
    })?;
    info!(
        "Discovered stream '{sheet}' with {} field(s), {method}",
        entry.declared_fields().len()
    );
    Ok(Some(entry))
}

/// Entries for the document-level streams, in their fixed order. Each
/// stream succeeds or fails on its own.
pub fn metadata_entries(
    keys: &KeyMap,
    config: &DiscoveryConfig,
) -> Vec<Result<CatalogEntry, DiscoveryError>> {
    fixed_streams()
        .into_iter()
        .map(|stream| {
            let names = stream.properties.keys().map(String::as_str).collect::<Vec<_>>();
            let resolved = resolve_keys(stream.name, &names, keys, &config.deviations).map_err(
                |source| DiscoveryError::MetadataStream {
                    stream: stream.name.to_string(),
                    source,
                },
            )?;
            let fields = stream
                .properties
                .iter()
                .map(|(name, schema)| FieldSpec {
                    name: name.clone(),
                    inclusion: if resolved.forces_automatic(name) {
                        Inclusion::Automatic
                    } else {
                        Inclusion::Available
                    },
                    schema: schema.clone(),
                })
                .collect();
            let method = select_method(&resolved.replication_keys);
            assemble(stream.name, fields, &resolved, method).map_err(|source| {
                DiscoveryError::MetadataStreamIntegrity {
                    stream: stream.name.to_string(),
                    source,
                }
            })
        })
        .collect()
}

/// Builds the catalog for a whole document.
///
/// A failing tab is reported in [`DiscoveryReport::failures`] and never stops
/// its siblings. Cancellation discards every result.
pub fn discover(
    document: &Document,
    config: &DiscoveryConfig,
    cancel: &CancellationToken,
) -> Result<DiscoveryReport, DiscoveryError> {
    let keys = config.key_map();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| DiscoveryError::WorkerPool(e.to_string()))?;

    let outcomes: Vec<Option<TabOutcome>> = pool.install(|| {
        document
            .sheets
            .par_iter()
            .enumerate()
            .map(|(position, sheet)| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(discover_tab(sheet, position, &keys, config))
            })
            .collect()
    });
    if cancel.is_cancelled() || outcomes.iter().any(Option::is_none) {
        warn!("Discovery cancelled, discarding {} tab result(s)", outcomes.len());
        return Err(DiscoveryError::Cancelled);
    }

    let mut report = DiscoveryReport::default();
    if config.include_metadata_streams {
        for entry in metadata_entries(&keys, config) {
            match entry {
                Ok(entry) => report.catalog.streams.push(entry),
                Err(err) => {
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
        }
    }
    let sheets = document.sheets.iter().enumerate();
    for ((position, sheet), outcome) in sheets.zip(outcomes.into_iter().flatten()) {
        match outcome {
            TabOutcome::Stream(entry) => report.catalog.streams.push(entry),
            TabOutcome::Skipped => report.skipped.push(sheet.title(position)),
            TabOutcome::Failed(err) => {
                warn!("{err}");
                report.failures.push(err);
            }
        }
    }

    info!(
        "Discovered {} stream(s) from {} sheet(s); {} skipped, {} failed",
        report.catalog.streams.len(),
        document.sheets.len(),
        report.skipped.len(),
        report.failures.len()
    );
    Ok(report)
}
