//! Fixed streams that describe the spreadsheet document itself.

use serde_json::{Map, Value, json};

use crate::keys::{KeyMap, KeySpec};

pub const SPREADSHEET_METADATA: &str = "spreadsheet_metadata";
pub const SHEET_METADATA: &str = "sheet_metadata";
pub const SHEETS_LOADED: &str = "sheets_loaded";
pub const FILE_METADATA: &str = "file_metadata";

#[derive(Debug, Clone, PartialEq)]
pub struct FixedStream {
    pub name: &'static str,
    pub keys: KeySpec,
    pub properties: Map<String, Value>,
}

fn nullable(kind: &str) -> Value {
    json!({"type": ["null", kind]})
}

fn date_time() -> Value {
    json!({"type": ["null", "string"], "format": "date-time"})
}

fn object(properties: Value) -> Value {
    json!({
        "type": ["null", "object"],
        "additionalProperties": false,
        "properties": properties
    })
}

fn properties(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn fixed_streams() -> Vec<FixedStream> {
    vec![
        FixedStream {
            name: SPREADSHEET_METADATA,
            keys: KeySpec::new(&["spreadsheetId"], &[]),
            properties: properties(json!({
                "spreadsheetId": nullable("string"),
                "properties": object(json!({
                    "title": nullable("string"),
                    "locale": nullable("string"),
                    "autoRecalc": nullable("string"),
                    "timeZone": nullable("string")
                })),
                "spreadsheetUrl": nullable("string")
            })),
        },
        FixedStream {
            name: SHEET_METADATA,
            keys: KeySpec::new(&["sheetId"], &[]),
            properties: properties(json!({
                "spreadsheetId": nullable("string"),
                "sheetId": nullable("integer"),
                "title": nullable("string"),
                "index": nullable("integer"),
                "sheetType": nullable("string"),
                "sheetUrl": nullable("string"),
                "gridProperties": object(json!({
                    "rowCount": nullable("integer"),
                    "columnCount": nullable("integer"),
                    "frozenRowCount": nullable("integer"),
                    "frozenColumnCount": nullable("integer")
                })),
                "columns": {
                    "type": ["null", "array"],
                    "items": object(json!({
                        "columnIndex": nullable("integer"),
                        "columnLetter": nullable("string"),
                        "columnName": nullable("string"),
                        "columnType": nullable("string"),
                        "columnSkipped": nullable("boolean")
                    }))
                }
            })),
        },
        FixedStream {
            name: SHEETS_LOADED,
            keys: KeySpec::new(&["spreadsheetId", "sheetId", "loadDate"], &[]),
            properties: properties(json!({
                "spreadsheetId": nullable("string"),
                "sheetId": nullable("integer"),
                "sheetTitle": nullable("string"),
                "loadDate": date_time(),
                "lastRowNumber": nullable("integer")
            })),
        },
        FixedStream {
            name: FILE_METADATA,
            keys: KeySpec::new(&["id"], &["modifiedTime"]),
            properties: properties(json!({
                "id": nullable("string"),
                "name": nullable("string"),
                "modifiedTime": date_time(),
                "version": nullable("integer"),
                "teamDriveId": nullable("string"),
                "driveId": nullable("string"),
                "lastModifyingUser": object(json!({
                    "kind": nullable("string"),
                    "displayName": nullable("string"),
                    "photoLink": nullable("string"),
                    "me": nullable("boolean"),
                    "permissionId": nullable("string"),
                    "emailAddress": nullable("string")
                }))
            })),
        },
    ]
}

/// Key table preloaded with the fixed streams.
pub fn builtin_keys() -> KeyMap {
    let mut keys = KeyMap::new();
    for stream in fixed_streams() {
        keys.insert(stream.name, stream.keys);
    }
    keys
}
