mod common;

use std::collections::BTreeSet;

use common::{document, fixture_path, row};
use sheets_catalog::{
    catalog::Catalog,
    classify::{EmptyColumnPolicy, Inclusion},
    config::DiscoveryConfig,
    discover::{CancellationToken, discover},
    keys::ToleratedDeviations,
    replication::ReplicationMethod,
    tab::{Document, Tab},
    validate::{Check, Expectations, validate_catalog},
};

fn fixture_document() -> Document {
    Document::load(&fixture_path("spreadsheet.json")).expect("load fixture document")
}

fn discover_fixture(config: &DiscoveryConfig) -> Catalog {
    let report = discover(&fixture_document(), config, &CancellationToken::new())
        .expect("discover fixture");
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.skipped, vec!["Scratch"]);
    report.catalog
}

fn names(fields: BTreeSet<&str>) -> Vec<&str> {
    fields.into_iter().collect()
}

#[test]
fn fixture_catalog_satisfies_expectations() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    let expectations =
        Expectations::load(&fixture_path("expectations.yml")).expect("load expectations");
    let report = validate_catalog(&catalog, &expectations, &ToleratedDeviations::default());
    assert!(report.is_ok(), "{:#?}", report.violations);
    assert_eq!(report.streams_checked, 6);
}

#[test]
fn every_stream_has_one_breadcrumb_per_field() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    for entry in &catalog.streams {
        let top_level = entry.metadata.iter().filter(|m| m.breadcrumb.is_empty()).count();
        assert_eq!(top_level, 1, "{}", entry.tap_stream_id);
        for field in entry.declared_fields() {
            let matching = entry
                .metadata
                .iter()
                .filter(|m| m.breadcrumb == vec!["properties".to_string(), field.to_string()])
                .count();
            assert_eq!(matching, 1, "{}.{field}", entry.tap_stream_id);
        }
        assert_eq!(entry.metadata.len(), entry.declared_fields().len() + 1);
    }
}

#[test]
fn item_master_marks_gaps_and_blank_columns_unsupported() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    let entry = catalog.stream("Item Master").expect("Item Master stream");
    assert_eq!(
        names(entry.fields_with(Inclusion::Unsupported)),
        vec!["Description", "Legacy Code", "__sdc_skip_col_05"]
    );
    assert_eq!(
        names(entry.fields_with(Inclusion::Available)),
        vec![
            "Discontinued",
            "SKU",
            "Unit Cost",
            "__sdc_sheet_id",
            "__sdc_spreadsheet_id"
        ]
    );
    assert_eq!(entry.schema["properties"]["Discontinued"]["type"][1], "boolean");
    assert_eq!(
        entry.schema["properties"]["Unit Cost"]["anyOf"][0]["type"],
        "number"
    );
}

#[test]
fn omit_policy_drops_blank_columns_only() {
    let mut config = DiscoveryConfig::default();
    config.classifier.empty_columns = EmptyColumnPolicy::Omit;
    let catalog = discover_fixture(&config);
    let entry = catalog.stream("Item Master").expect("Item Master stream");
    assert!(!entry.declared_fields().contains(&"Legacy Code"));
    assert_eq!(
        names(entry.fields_with(Inclusion::Unsupported)),
        vec!["Description", "__sdc_skip_col_05"]
    );
}

#[test]
fn configured_keys_switch_orders_to_incremental() {
    let config = DiscoveryConfig::load(&fixture_path("config.yml")).expect("load config");
    let catalog = discover_fixture(&config);
    let orders = catalog.stream("Orders").expect("Orders stream");
    assert_eq!(orders.key_properties, vec!["order_id"]);
    assert_eq!(orders.replication_keys(), vec!["ordered_at"]);
    assert_eq!(orders.replication_method(), Some(ReplicationMethod::Incremental));
    assert_eq!(
        names(orders.fields_with(Inclusion::Automatic)),
        vec!["__sdc_row", "order_id", "ordered_at"]
    );
    assert_eq!(
        orders.schema["properties"]["ordered_at"]["anyOf"][0]["format"],
        "date-time"
    );
}

#[test]
fn replication_method_tracks_replication_keys() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    for entry in &catalog.streams {
        let expected = if entry.replication_keys().is_empty() {
            ReplicationMethod::FullTable
        } else {
            ReplicationMethod::Incremental
        };
        assert_eq!(entry.replication_method(), Some(expected), "{}", entry.tap_stream_id);
    }
}

#[test]
fn file_metadata_replication_key_stays_available() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    let files = catalog.stream("file_metadata").expect("file_metadata stream");
    assert_eq!(names(files.fields_with(Inclusion::Automatic)), vec!["id"]);
    assert_eq!(
        files.field_metadata("modifiedTime").map(|md| md.inclusion),
        Some(Inclusion::Available)
    );

    let strict = DiscoveryConfig {
        deviations: ToleratedDeviations::none(),
        ..DiscoveryConfig::default()
    };
    let catalog = discover_fixture(&strict);
    let files = catalog.stream("file_metadata").expect("file_metadata stream");
    assert_eq!(
        names(files.fields_with(Inclusion::Automatic)),
        vec!["id", "modifiedTime"]
    );
}

#[test]
fn strict_deviations_flag_the_fixture() {
    let catalog = discover_fixture(&DiscoveryConfig::default());
    let expectations =
        Expectations::load(&fixture_path("expectations.yml")).expect("load expectations");
    let report = validate_catalog(&catalog, &expectations, &ToleratedDeviations::none());
    let automatic = report
        .violations_for(Check::AutomaticFields)
        .map(|v| v.stream.clone().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(automatic, vec!["file_metadata"]);
}

#[test]
fn rediscovery_is_byte_identical() {
    let config = DiscoveryConfig::default();
    let first = discover_fixture(&config);
    let second = discover_fixture(&config);
    assert_eq!(
        serde_json::to_string_pretty(&first).expect("json"),
        serde_json::to_string_pretty(&second).expect("json")
    );
    assert_eq!(
        first.fingerprint().expect("fingerprint"),
        second.fingerprint().expect("fingerprint")
    );
}

#[test]
fn corrupt_sheet_is_isolated() {
    let doc = document(vec![
        Tab::new("Good", vec![row(&["a"]), row(&["1"])]),
        Tab::new("Broken", vec![row(&["a", "b", "a"])]),
        Tab::new("Also Good", vec![row(&["x"]), row(&["y"])]),
    ]);
    let config = DiscoveryConfig {
        include_metadata_streams: false,
        ..DiscoveryConfig::default()
    };
    let report = discover(&doc, &config, &CancellationToken::new()).expect("discover");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].sheet(), Some("Broken"));
    let ids = report
        .catalog
        .streams
        .iter()
        .map(|s| s.tap_stream_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["Good", "Also Good"]);
}

#[test]
fn unreadable_sheet_content_is_isolated() {
    let raw = r#"{
        "spreadsheetId": "doc",
        "sheets": [
            {"properties": {"title": "Good"}, "rows": [[{"formattedValue": "id"}], [{"formattedValue": "1"}]]},
            {"properties": {"title": "Bad"}, "rows": [[{"formattedValue": "id", "effectiveValue": {"numberValue": "oops"}}]]},
            {"properties": {"sheetId": 3}, "rows": {"not": "a grid"}}
        ]
    }"#;
    let doc: Document = serde_json::from_str(raw).expect("document parses despite bad sheets");
    let config = DiscoveryConfig {
        include_metadata_streams: false,
        ..DiscoveryConfig::default()
    };
    let report = discover(&doc, &config, &CancellationToken::new()).expect("discover");

    let ids = report
        .catalog
        .streams
        .iter()
        .map(|s| s.tap_stream_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["Good"]);
    let failed = report
        .failures
        .iter()
        .map(|f| f.sheet().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(failed, vec!["Bad", "#2"]);
    assert!(report.failures[0].to_string().contains("could not be read"));
}
