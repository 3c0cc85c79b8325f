#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sheets_catalog::tab::{Cell, Document, Sheet, Tab};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }
}

/// A row of string cells; `""` becomes a blank cell.
pub fn row(values: &[&str]) -> Vec<Cell> {
    values
        .iter()
        .map(|value| {
            if value.is_empty() {
                Cell::empty()
            } else {
                Cell::string(*value)
            }
        })
        .collect()
}

pub fn document(sheets: Vec<Tab>) -> Document {
    Document {
        spreadsheet_id: "test-spreadsheet".to_string(),
        title: Some("Test".to_string()),
        sheets: sheets.into_iter().map(Sheet::from).collect(),
    }
}
