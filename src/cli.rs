use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::classify::EmptyColumnPolicy;

#[derive(Debug, Parser)]
#[command(author, version, about = "Discover spreadsheet tabs as replicable streams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a catalog from a fetched spreadsheet document
    Discover(DiscoverArgs),
    /// Check a catalog against expected keys, methods and inclusions
    Validate(ValidateArgs),
    /// Print the SHA-256 fingerprint of a catalog (object keys sorted)
    Fingerprint(FingerprintArgs),
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Spreadsheet document JSON (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Catalog output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML configuration with keys, deviations and classifier settings
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Worker threads (0 means one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,
    /// Number of data rows inspected per column (0 means full scan)
    #[arg(long = "sample-rows")]
    pub sample_rows: Option<usize>,
    /// How to treat a header whose data range has no values
    #[arg(long = "empty-columns", value_enum)]
    pub empty_columns: Option<EmptyColumnPolicy>,
    /// Leave the document-level metadata streams out of the catalog
    #[arg(long = "no-metadata-streams")]
    pub no_metadata_streams: bool,
    /// Write the catalog even when some sheets failed
    #[arg(long = "keep-going")]
    pub keep_going: bool,
    /// Expectations YAML to validate the new catalog against before writing
    #[arg(long = "check")]
    pub check: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Catalog JSON to validate
    #[arg(short = 'c', long = "catalog")]
    pub catalog: PathBuf,
    /// Expectations YAML
    #[arg(short = 'e', long = "expectations")]
    pub expectations: PathBuf,
    /// Configuration YAML providing tolerated deviations (defaults apply otherwise)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Catalog JSON (`-` for stdin)
    #[arg(short = 'c', long = "catalog")]
    pub catalog: PathBuf,
}
