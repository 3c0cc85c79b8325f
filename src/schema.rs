//! JSON schema inference for sheet columns.
//!
//! A column is typed by its first populated data cell. Numbers carry their
//! number format along, so dates and times stay strings with a `format`
//! and plain numbers fall back to strings when a later row disagrees.

use log::{info, warn};
use serde_json::{Map, Value, json};

use crate::{
    classify::ColumnProfile,
    error::ClassificationError,
    scan::{ColumnKind, ROW_MARKER_COLUMN, SHEET_ID_COLUMN, ScannedColumn},
    tab::{ExtendedValue, NumberFormatType},
};

/// Provider-side type tag recorded for each column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Boolean,
    Number,
    Date,
    Time,
    DateTime,
    Formula,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "stringValue",
            ColumnType::Boolean => "boolValue",
            ColumnType::Number => "numberType",
            ColumnType::Date => "numberType.DATE",
            ColumnType::Time => "numberType.TIME",
            ColumnType::DateTime => "numberType.DATE_TIME",
            ColumnType::Formula => "unsupportedValue",
        }
    }

    pub fn json_schema(&self) -> Value {
        let nullable_string = json!({"type": ["null", "string"]});
        match self {
            ColumnType::String | ColumnType::Formula => nullable_string,
            ColumnType::Boolean => json!({"type": ["null", "boolean", "string"]}),
            ColumnType::Number => json!({
                "anyOf": [
                    {"type": "number", "multipleOf": 1e-15},
                    nullable_string
                ]
            }),
            ColumnType::Date => temporal("date"),
            ColumnType::Time => temporal("time"),
            ColumnType::DateTime => temporal("date-time"),
        }
    }
}

fn temporal(format: &str) -> Value {
    json!({
        "anyOf": [
            {"type": ["null", "string"], "format": format},
            {"type": ["null", "string"]}
        ]
    })
}

/// Type of one column from its profile.
pub fn infer_column_type(
    sheet: &str,
    column: &ScannedColumn,
    profile: &ColumnProfile,
) -> Result<ColumnType, ClassificationError> {
    match column.kind {
        ColumnKind::System { .. } if column.name == ROW_MARKER_COLUMN => Ok(ColumnType::Number),
        ColumnKind::System { .. } if column.name == SHEET_ID_COLUMN => Ok(ColumnType::Number),
        ColumnKind::System { .. } | ColumnKind::Placeholder => Ok(ColumnType::String),
        ColumnKind::Header => {
            let Some((row, cell)) = &profile.type_cell else {
                info!(
                    "Sheet '{sheet}', column '{}': no value below the header, typing as string",
                    column.name
                );
                return Ok(ColumnType::String);
            };
            let column_type = match &cell.effective_value {
                None | Some(ExtendedValue::StringValue(_)) => ColumnType::String,
                Some(ExtendedValue::BoolValue(_)) => ColumnType::Boolean,
                Some(ExtendedValue::NumberValue(_)) => match cell.number_format() {
                    Some(NumberFormatType::DateTime) => ColumnType::DateTime,
                    Some(NumberFormatType::Date) => ColumnType::Date,
                    Some(NumberFormatType::Time) => ColumnType::Time,
                    Some(NumberFormatType::Text) => ColumnType::String,
                    _ => ColumnType::Number,
                },
                Some(ExtendedValue::FormulaValue(formula)) => {
                    warn!(
                        "Sheet '{sheet}', column '{}': cell {}{row} holds formula {formula}, typing as string",
                        column.name, column.letter
                    );
                    ColumnType::Formula
                }
                Some(ExtendedValue::ErrorValue(error)) => {
                    return Err(ClassificationError::ErrorValue {
                        sheet: sheet.to_string(),
                        column: column.name.clone(),
                        cell: format!("{}{row}", column.letter),
                        value: error.kind.clone(),
                    });
                }
            };
            Ok(column_type)
        }
    }
}

/// Schema for one property; numeric system columns are integers.
pub fn property_schema(column: &ScannedColumn, column_type: ColumnType) -> Value {
    match column.kind {
        ColumnKind::System { .. } if column_type == ColumnType::Number => {
            json!({"type": ["null", "integer"]})
        }
        _ => column_type.json_schema(),
    }
}

pub fn object_schema(properties: Map<String, Value>) -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": Value::Object(properties)
    })
}
