pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod io_utils;
pub mod keys;
pub mod replication;
pub mod scan;
pub mod schema;
pub mod streams;
pub mod tab;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, error, info};

use crate::{
    catalog::Catalog,
    cli::{Cli, Commands},
    config::DiscoveryConfig,
    discover::CancellationToken,
    tab::Document,
    validate::{Expectations, ValidationReport},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheets_catalog", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Discover(args) => handle_discover(&args),
        Commands::Validate(args) => handle_validate(&args),
        Commands::Fingerprint(args) => handle_fingerprint(&args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<DiscoveryConfig> {
    match path {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}")),
        None => Ok(DiscoveryConfig::default()),
    }
}

fn handle_discover(args: &cli::DiscoverArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(sample_rows) = args.sample_rows {
        config.classifier.sample_rows = sample_rows;
    }
    if let Some(policy) = args.empty_columns {
        config.classifier.empty_columns = policy;
    }
    if args.no_metadata_streams {
        config.include_metadata_streams = false;
    }
    debug!("Discovery configuration: {config:?}");

    info!("Discovering streams from '{}'", args.input.display());
    let document = Document::load(&args.input)
        .with_context(|| format!("Loading spreadsheet document {:?}", args.input))?;
    let report = discover::discover(&document, &config, &CancellationToken::new())?;

    if !report.is_clean() {
        for failure in &report.failures {
            error!("{failure}");
        }
        if !args.keep_going {
            bail!(
                "{} stream(s) failed discovery; rerun with --keep-going to write the remaining streams",
                report.failures.len()
            );
        }
    }

    if let Some(path) = &args.check {
        let expectations = Expectations::load(path)?;
        let validation =
            validate::validate_catalog(&report.catalog, &expectations, &config.deviations);
        ensure_valid(&validation)?;
    }

    report
        .catalog
        .save(args.output.as_deref())
        .with_context(|| format!("Writing catalog to {:?}", args.output))?;
    info!(
        "Catalog with {} stream(s) written, fingerprint {}",
        report.catalog.streams.len(),
        report.catalog.fingerprint()?
    );
    Ok(())
}

fn handle_validate(args: &cli::ValidateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Loading catalog from {:?}", args.catalog))?;
    let expectations = Expectations::load(&args.expectations)?;
    let report = validate::validate_catalog(&catalog, &expectations, &config.deviations);
    ensure_valid(&report)?;
    info!(
        "✓ {:?} satisfies {} stream expectation(s)",
        args.catalog, report.streams_checked
    );
    Ok(())
}

fn handle_fingerprint(args: &cli::FingerprintArgs) -> Result<()> {
    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Loading catalog from {:?}", args.catalog))?;
    println!("{}", catalog.fingerprint()?);
    Ok(())
}

fn ensure_valid(report: &ValidationReport) -> Result<()> {
    if report.is_ok() {
        return Ok(());
    }
    for violation in &report.violations {
        error!("{violation}");
    }
    bail!(
        "Catalog violates {} contract check(s)",
        report.violations.len()
    )
}
