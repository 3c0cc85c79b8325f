//! Column classifier: decides the inclusion category of every scanned column
//! from how its data rows are populated.

use std::fmt;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    scan::{ColumnKind, ScannedColumn},
    tab::{Cell, Tab},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inclusion {
    Automatic,
    Available,
    Unsupported,
}

impl Inclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inclusion::Automatic => "automatic",
            Inclusion::Available => "available",
            Inclusion::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a populated header whose data range holds no values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum EmptyColumnPolicy {
    /// Keep the field and mark it unsupported, same as any other gap.
    #[default]
    Unsupported,
    /// Leave the field out of the schema and metadata.
    Omit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Data rows inspected per column; 0 scans the whole tab.
    pub sample_rows: usize,
    pub empty_columns: EmptyColumnPolicy,
}

/// Population summary of one column's data range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnProfile {
    pub rows_inspected: usize,
    pub populated: usize,
    /// 1-based sheet row of the first blank or missing cell.
    pub first_gap_row: Option<usize>,
    /// First populated cell and its 1-based sheet row; it decides the field type.
    pub type_cell: Option<(usize, Cell)>,
}

impl ColumnProfile {
    pub fn gaps(&self) -> usize {
        self.rows_inspected - self.populated
    }

    pub fn is_blank(&self) -> bool {
        self.populated == 0
    }
}

pub fn profile_column(tab: &Tab, column: &ScannedColumn, sample_rows: usize) -> ColumnProfile {
    let Some(offset) = column.cell_offset() else {
        return ColumnProfile::default();
    };
    let limit = if sample_rows == 0 {
        usize::MAX
    } else {
        sample_rows
    };

    let mut profile = ColumnProfile::default();
    for (idx, row) in tab.data_rows().iter().take(limit).enumerate() {
        let sheet_row = idx + 2;
        profile.rows_inspected += 1;
        match row.get(offset).filter(|cell| !cell.is_empty()) {
            Some(cell) => {
                profile.populated += 1;
                if profile.type_cell.is_none() {
                    profile.type_cell = Some((sheet_row, cell.clone()));
                }
            }
            None => {
                if profile.first_gap_row.is_none() {
                    profile.first_gap_row = Some(sheet_row);
                }
            }
        }
    }
    profile
}

/// Inclusion for one column; `None` drops the column from the stream.
///
/// `forced_automatic` is set by the key resolver for key columns.
pub fn classify(
    column: &ScannedColumn,
    profile: &ColumnProfile,
    forced_automatic: bool,
    config: &ClassifierConfig,
) -> Option<Inclusion> {
    let inclusion = match column.kind {
        _ if column.is_reserved() || forced_automatic => Inclusion::Automatic,
        ColumnKind::System { .. } => Inclusion::Available,
        ColumnKind::Placeholder => Inclusion::Unsupported,
        ColumnKind::Header if profile.is_blank() => match config.empty_columns {
            EmptyColumnPolicy::Unsupported => Inclusion::Unsupported,
            EmptyColumnPolicy::Omit => {
                debug!("Column '{}' has no values, omitting", column.name);
                return None;
            }
        },
        ColumnKind::Header if profile.gaps() > 0 => {
            debug!(
                "Column '{}' is missing a value at {}{}, marking unsupported",
                column.name,
                column.letter,
                profile.first_gap_row.unwrap_or_default()
            );
            Inclusion::Unsupported
        }
        ColumnKind::Header => Inclusion::Available,
    };
    Some(inclusion)
}
