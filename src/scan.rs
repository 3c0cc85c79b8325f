//! Tab scanner: turns the header row of a tab into an ordered column layout.

use std::collections::HashSet;

use log::{debug, info};

use crate::{error::ClassificationError, tab::Tab};

pub const SPREADSHEET_ID_COLUMN: &str = "__sdc_spreadsheet_id";
pub const SHEET_ID_COLUMN: &str = "__sdc_sheet_id";
pub const ROW_MARKER_COLUMN: &str = "__sdc_row";

const SKIP_COLUMN_PREFIX: &str = "__sdc_skip_col_";
const MAX_CONSECUTIVE_BLANK_HEADERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Connector-provided column that never maps to a sheet cell.
    System { reserved: bool },
    /// Populated header cell.
    Header,
    /// Blank header cell between populated ones.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedColumn {
    pub name: String,
    /// 1-based sheet column; 0 for system columns.
    pub index: usize,
    pub letter: String,
    pub kind: ColumnKind,
}

impl ScannedColumn {
    fn system(name: &str, reserved: bool) -> Self {
        ScannedColumn {
            name: name.to_string(),
            index: 0,
            letter: String::new(),
            kind: ColumnKind::System { reserved },
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self.kind, ColumnKind::System { .. })
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.kind, ColumnKind::System { reserved: true })
    }

    /// Zero-based position of this column inside a sheet row.
    pub fn cell_offset(&self) -> Option<usize> {
        match self.kind {
            ColumnKind::System { .. } => None,
            _ => Some(self.index - 1),
        }
    }
}

/// Header layout of a tab that will become a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSkeleton {
    pub stream: String,
    pub columns: Vec<ScannedColumn>,
}

impl TabSkeleton {
    pub fn column(&self, name: &str) -> Option<&ScannedColumn> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Spreadsheet column letter for a 1-based index (1 → A, 27 → AA).
pub fn column_letter(index: usize) -> String {
    let mut remaining = index;
    let mut letters = Vec::new();
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Returns `None` when the header row is missing or entirely blank.
pub fn scan(tab: &Tab) -> Result<Option<TabSkeleton>, ClassificationError> {
    let sheet = tab.name();
    let header = tab.header_row();
    if header.iter().all(|cell| cell.label().is_none()) {
        info!("Skipping sheet '{sheet}': header row is empty");
        return Ok(None);
    }

    let mut columns = vec![
        ScannedColumn::system(SPREADSHEET_ID_COLUMN, false),
        ScannedColumn::system(SHEET_ID_COLUMN, false),
        ScannedColumn::system(ROW_MARKER_COLUMN, true),
    ];
    let mut seen = HashSet::new();
    let mut blank_run = 0usize;

    for (offset, cell) in header.iter().enumerate() {
        let index = offset + 1;
        let letter = column_letter(index);
        match cell.label() {
            Some(label) => {
                blank_run = 0;
                if columns
                    .iter()
                    .any(|column| column.is_system() && column.name == label)
                {
                    return Err(ClassificationError::ReservedHeader {
                        sheet: sheet.to_string(),
                        header: label.to_string(),
                        cell: format!("{letter}1"),
                    });
                }
                if !seen.insert(label.to_string()) {
                    return Err(ClassificationError::DuplicateHeader {
                        sheet: sheet.to_string(),
                        header: label.to_string(),
                        cell: format!("{letter}1"),
                    });
                }
                columns.push(ScannedColumn {
                    name: label.to_string(),
                    index,
                    letter,
                    kind: ColumnKind::Header,
                });
            }
            None => {
                blank_run += 1;
                if blank_run >= MAX_CONSECUTIVE_BLANK_HEADERS {
                    if columns
                        .last()
                        .is_some_and(|column| column.kind == ColumnKind::Placeholder)
                    {
                        columns.pop();
                    }
                    info!(
                        "Sheet '{sheet}': {MAX_CONSECUTIVE_BLANK_HEADERS} consecutive blank headers, stopping scan at {letter}1"
                    );
                    break;
                }
                let name = format!("{SKIP_COLUMN_PREFIX}{index:02}");
                debug!("Sheet '{sheet}': blank header at {letter}1 kept as {name}");
                columns.push(ScannedColumn {
                    name,
                    index,
                    letter,
                    kind: ColumnKind::Placeholder,
                });
            }
        }
    }

    Ok(Some(TabSkeleton {
        stream: sheet.to_string(),
        columns,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::Cell;

    fn header(labels: &[&str]) -> Vec<Cell> {
        labels
            .iter()
            .map(|label| {
                if label.is_empty() {
                    Cell::empty()
                } else {
                    Cell::string(*label)
                }
            })
            .collect()
    }

    fn names(skeleton: &TabSkeleton) -> Vec<&str> {
        skeleton.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn sheet_names(skeleton: &TabSkeleton) -> Vec<&str> {
        skeleton
            .columns
            .iter()
            .filter(|c| !c.is_system())
            .map(|c| c.name.as_str())
            .collect()
    }

    #[test]
    fn column_letters_roll_over() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn blank_header_row_yields_no_stream() {
        let tab = Tab::new("Blank", vec![header(&["", "", ""]), header(&["1", "2"])]);
        assert_eq!(scan(&tab).expect("scan"), None);
        assert_eq!(scan(&Tab::new("Nothing", Vec::new())).expect("scan"), None);
    }

    #[test]
    fn system_columns_lead_the_layout() {
        let tab = Tab::new("Orders", vec![header(&["id", "total"])]);
        let skeleton = scan(&tab).expect("scan").expect("stream");
        assert_eq!(
            names(&skeleton),
            vec![
                SPREADSHEET_ID_COLUMN,
                SHEET_ID_COLUMN,
                ROW_MARKER_COLUMN,
                "id",
                "total"
            ]
        );
        assert!(skeleton.column(ROW_MARKER_COLUMN).expect("row").is_reserved());
        assert!(!skeleton.column(SHEET_ID_COLUMN).expect("sheet").is_reserved());
        assert_eq!(skeleton.column("total").expect("total").letter, "B");
    }

    #[test]
    fn single_blank_header_becomes_placeholder() {
        let tab = Tab::new("Gaps", vec![header(&["a", "", "c"])]);
        let skeleton = scan(&tab).expect("scan").expect("stream");
        let placeholder = skeleton.column("__sdc_skip_col_02").expect("placeholder");
        assert_eq!(placeholder.kind, ColumnKind::Placeholder);
        assert_eq!(placeholder.cell_offset(), Some(1));
        assert!(skeleton.column("c").is_some());
    }

    #[test]
    fn two_blank_headers_stop_the_scan() {
        let tab = Tab::new("Stops", vec![header(&["a", "", "", "d"])]);
        let skeleton = scan(&tab).expect("scan").expect("stream");
        assert_eq!(sheet_names(&skeleton), vec!["a"]);
    }

    #[test]
    fn single_trailing_blank_header_is_kept() {
        let tab = Tab::new("Trailing", vec![header(&["a", "b", ""])]);
        let skeleton = scan(&tab).expect("scan").expect("stream");
        assert_eq!(sheet_names(&skeleton).len(), 3);
        assert!(skeleton.column("__sdc_skip_col_03").is_some());
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let tab = Tab::new("Dupes", vec![header(&["id", "name", "id"])]);
        let err = scan(&tab).expect_err("duplicate header");
        assert_eq!(
            err,
            ClassificationError::DuplicateHeader {
                sheet: "Dupes".to_string(),
                header: "id".to_string(),
                cell: "C1".to_string(),
            }
        );
    }

    #[test]
    fn system_column_names_cannot_be_headers() {
        let tab = Tab::new("Rows", vec![header(&["id", "__sdc_row"])]);
        let err = scan(&tab).expect_err("reserved header");
        assert_eq!(
            err,
            ClassificationError::ReservedHeader {
                sheet: "Rows".to_string(),
                header: "__sdc_row".to_string(),
                cell: "B1".to_string(),
            }
        );

        let tab = Tab::new("Ids", vec![header(&[" __sdc_sheet_id "])]);
        assert!(matches!(
            scan(&tab),
            Err(ClassificationError::ReservedHeader { cell, .. }) if cell == "A1"
        ));
    }
}
