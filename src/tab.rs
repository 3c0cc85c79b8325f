//! Raw spreadsheet model handed over by the fetch layer.
//!
//! Cells mirror the provider's grid shape (`formattedValue`,
//! `effectiveValue`, `effectiveFormat.numberFormat.type`) so a fetched
//! document can be deserialized without translation. A sheet that does not
//! fit that shape is kept as raw JSON and only fails inside its own pipeline.

use std::{borrow::Cow, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ClassificationError, io_utils};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = io_utils::open_input(path)?;
        serde_json::from_reader(reader)
            .with_context(|| format!("Parsing spreadsheet document {path:?}"))
    }
}

/// One entry of `sheets` as delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Sheet {
    Parsed(Tab),
    Raw(Value),
}

impl Sheet {
    /// Sheet title, or its position in the document when the title is unreadable.
    pub fn title(&self, position: usize) -> String {
        match self {
            Sheet::Parsed(tab) => tab.name().to_string(),
            Sheet::Raw(value) => value
                .pointer("/properties/title")
                .and_then(Value::as_str)
                .map_or_else(|| format!("#{position}"), str::to_string),
        }
    }

    pub fn to_tab(&self, position: usize) -> Result<Cow<'_, Tab>, ClassificationError> {
        match self {
            Sheet::Parsed(tab) => Ok(Cow::Borrowed(tab)),
            Sheet::Raw(value) => Tab::deserialize(value).map(Cow::Owned).map_err(|err| {
                ClassificationError::Malformed {
                    sheet: self.title(position),
                    reason: err.to_string(),
                }
            }),
        }
    }
}

impl From<Tab> for Sheet {
    fn from(tab: Tab) -> Self {
        Sheet::Parsed(tab)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabProperties {
    #[serde(default)]
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: usize,
}

/// One sheet of the document. Row 0 is the header row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub properties: TabProperties,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Tab {
    pub fn new(title: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Tab {
            properties: TabProperties {
                title: title.into(),
                ..TabProperties::default()
            },
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.properties.title
    }

    pub fn header_row(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_value: Option<ExtendedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_format: Option<CellFormat>,
}

impl Cell {
    pub fn empty() -> Self {
        Cell::default()
    }

    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        Cell {
            formatted_value: Some(value.clone()),
            effective_value: Some(ExtendedValue::StringValue(value)),
            effective_format: None,
        }
    }

    pub fn number(value: f64) -> Self {
        Cell {
            formatted_value: Some(value.to_string()),
            effective_value: Some(ExtendedValue::NumberValue(value)),
            effective_format: None,
        }
    }

    pub fn formatted_number(value: f64, formatted: &str, format: NumberFormatType) -> Self {
        Cell {
            formatted_value: Some(formatted.to_string()),
            effective_value: Some(ExtendedValue::NumberValue(value)),
            effective_format: Some(CellFormat {
                number_format: Some(NumberFormat { kind: format }),
            }),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Cell {
            formatted_value: Some(if value { "TRUE" } else { "FALSE" }.to_string()),
            effective_value: Some(ExtendedValue::BoolValue(value)),
            effective_format: None,
        }
    }

    pub fn error(kind: &str, message: &str) -> Self {
        Cell {
            formatted_value: Some(format!("#{kind}")),
            effective_value: Some(ExtendedValue::ErrorValue(ErrorValue {
                kind: kind.to_string(),
                message: message.to_string(),
            })),
            effective_format: None,
        }
    }

    /// Trimmed formatted text, `None` when the cell shows nothing.
    pub fn label(&self) -> Option<&str> {
        self.formatted_value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.label().is_none()
            && match &self.effective_value {
                None => true,
                Some(ExtendedValue::StringValue(value)) => value.trim().is_empty(),
                Some(_) => false,
            }
    }

    pub fn number_format(&self) -> Option<NumberFormatType> {
        self.effective_format
            .as_ref()
            .and_then(|format| format.number_format.as_ref())
            .map(|format| format.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ExtendedValue {
    NumberValue(f64),
    StringValue(String),
    BoolValue(bool),
    FormulaValue(String),
    ErrorValue(ErrorValue),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorValue {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<NumberFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumberFormat {
    #[serde(rename = "type")]
    pub kind: NumberFormatType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumberFormatType {
    NumberFormatTypeUnspecified,
    Text,
    Number,
    Percent,
    Currency,
    Date,
    Time,
    DateTime,
    Scientific,
}
