mod common;

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestWorkspace, fixture_path};
use predicates::{prelude::PredicateBooleanExt, str::contains};
use sheets_catalog::catalog::Catalog;

#[test]
fn discover_writes_catalog_file() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("catalog.json");
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let catalog = Catalog::load(&output).expect("load catalog");
    assert_eq!(catalog.streams.len(), 6);
    assert!(catalog.stream("Item Master").is_some());
    assert!(catalog.stream("Scratch").is_none());
}

#[test]
fn discover_prints_to_stdout_without_output() {
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "--no-metadata-streams",
        ])
        .assert()
        .success()
        .stdout(contains("\"tap_stream_id\": \"Item Master\""))
        .stdout(contains("\"inclusion\": \"unsupported\""))
        .stdout(contains("file_metadata").not());
}

#[test]
fn discover_reads_document_from_stdin() {
    let raw = fs::read_to_string(fixture_path("spreadsheet.json")).expect("read fixture");
    cargo_bin_cmd!("sheets-catalog")
        .args(["discover", "-i", "-", "--threads", "1"])
        .write_stdin(raw)
        .assert()
        .success()
        .stdout(contains("\"tap_stream_id\": \"Orders\""));
}

#[test]
fn discover_check_accepts_matching_expectations() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("catalog.json");
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--check",
            fixture_path("expectations.yml").to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(output.exists());
}

#[test]
fn discover_check_rejects_config_that_breaks_expectations() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("catalog.json");
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-c",
            fixture_path("config.yml").to_str().unwrap(),
            "--check",
            fixture_path("expectations.yml").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("contract check"));
    assert!(!output.exists());
}

#[test]
fn discover_fails_on_broken_sheet_unless_keep_going() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "broken.json",
        r#"{
            "spreadsheetId": "x",
            "sheets": [
                {"properties": {"title": "Dupes"}, "rows": [[{"formattedValue": "a"}, {"formattedValue": "a"}]]},
                {"properties": {"title": "Garbled"}, "rows": [[{"effectiveValue": {"numberValue": "oops"}}]]},
                {"properties": {"title": "Fine"}, "rows": [[{"formattedValue": "a"}]]}
            ]
        }"#,
    );
    let output = workspace.file("catalog.json");

    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("2 stream(s) failed").and(contains("--keep-going")));
    assert!(!output.exists());

    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--keep-going",
            "--no-metadata-streams",
        ])
        .assert()
        .success();
    let catalog = Catalog::load(&output).expect("load catalog");
    assert_eq!(catalog.streams.len(), 1);
    assert_eq!(catalog.streams[0].tap_stream_id, "Fine");
}

#[test]
fn discover_omit_flag_drops_blank_columns() {
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "--empty-columns",
            "omit",
        ])
        .assert()
        .success()
        .stdout(contains("Legacy Code").not());
}

#[test]
fn validate_reports_violations() {
    let workspace = TestWorkspace::new();
    let catalog_path = workspace.file("catalog.json");
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "discover",
            "-i",
            fixture_path("spreadsheet.json").to_str().unwrap(),
            "-o",
            catalog_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    cargo_bin_cmd!("sheets-catalog")
        .args([
            "validate",
            "-c",
            catalog_path.to_str().unwrap(),
            "-e",
            fixture_path("expectations.yml").to_str().unwrap(),
        ])
        .assert()
        .success();

    let strict = workspace.write(
        "strict.yml",
        "deviations:\n  non_automatic_replication_keys: []\n  unsupported_exempt_streams: []\n",
    );
    cargo_bin_cmd!("sheets-catalog")
        .args([
            "validate",
            "-c",
            catalog_path.to_str().unwrap(),
            "-e",
            fixture_path("expectations.yml").to_str().unwrap(),
            "--config",
            strict.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("[file_metadata] automatic fields"));
}

#[test]
fn fingerprint_is_stable_between_runs() {
    let workspace = TestWorkspace::new();
    let first = workspace.file("first.json");
    let second = workspace.file("second.json");
    for path in [&first, &second] {
        cargo_bin_cmd!("sheets-catalog")
            .args([
                "discover",
                "-i",
                fixture_path("spreadsheet.json").to_str().unwrap(),
                "-o",
                path.to_str().unwrap(),
            ])
            .assert()
            .success();
    }
    assert_eq!(
        fs::read(&first).expect("read first"),
        fs::read(&second).expect("read second")
    );

    let expected = Catalog::load(&first)
        .expect("load catalog")
        .fingerprint()
        .expect("fingerprint");
    cargo_bin_cmd!("sheets-catalog")
        .args(["fingerprint", "-c", second.to_str().unwrap()])
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}
