//! Heurist to RO-Crate CLI
//!
//! Command-line tool converting a Heurist database export into an RO-Crate
//! directory or zip archive.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use heurist_rocrate::{
    convert, write_directory, write_zip, CollectedDiagnostics, Configuration, ConvertError,
    ConvertOptions, SourceDatabase, TracingDiagnostics, DEFAULT_NAMESPACE_BASE,
};

#[derive(Parser)]
#[command(name = "heurist-rocrate")]
#[command(about = "Convert a Heurist database export into an RO-Crate")]
#[command(version)]
struct Cli {
    /// Path to the Heurist JSON export
    source: PathBuf,

    /// Output directory, or zip file with --zip
    #[arg(short, long)]
    output: PathBuf,

    /// Mapping configuration (an RO-Crate metadata file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the uploaded files the export refers to
    #[arg(long)]
    files: Option<PathBuf>,

    /// Write a zip archive instead of a directory
    #[arg(long)]
    zip: bool,

    /// Root dataset name (default: the database name)
    #[arg(long)]
    name: Option<String>,

    /// Root dataset description
    #[arg(long)]
    description: Option<String>,

    /// Base URL of the generated vocabulary namespace
    #[arg(long, default_value = DEFAULT_NAMESPACE_BASE)]
    namespace_base: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

/// Read a file, reporting the path on failure
fn read_file(path: &Path) -> Result<String, ConvertError> {
    fs::read_to_string(path).map_err(|e| ConvertError::LoadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_configuration(
    path: Option<&PathBuf>,
    diagnostics: &CollectedDiagnostics,
) -> Result<Configuration, ConvertError> {
    match path {
        Some(path) => {
            let content = read_file(path)?;
            Configuration::from_json_str(&content, diagnostics).map_err(|e| {
                ConvertError::LoadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })
        }
        None => Ok(Configuration::empty()),
    }
}

fn run(cli: Cli) -> Result<(), ConvertError> {
    let tracing = TracingDiagnostics;
    let diagnostics = CollectedDiagnostics::forwarding(&tracing);

    let content = read_file(&cli.source)?;
    let source = SourceDatabase::from_json_str(&content, &diagnostics).map_err(|e| {
        ConvertError::LoadError {
            path: cli.source.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    let configuration = load_configuration(cli.config.as_ref(), &diagnostics)?;

    let options = ConvertOptions {
        namespace_base: cli.namespace_base,
        name: cli.name,
        description: cli.description,
    };
    let result = convert(&source, &configuration, &options, &diagnostics)?;

    if cli.files.is_none() && !result.uploaded_files.is_empty() {
        eprintln!(
            "No --files directory given, {} uploaded files left out",
            result.uploaded_files.len()
        );
    }

    if cli.zip {
        write_zip(&result, &cli.output, cli.files.as_deref(), cli.pretty)?;
    } else {
        write_directory(&result, &cli.output, cli.files.as_deref(), cli.pretty)?;
    }

    eprintln!(
        "Converted {} ({} warnings)",
        result.stats,
        diagnostics.warning_count()
    );
    eprintln!("Wrote crate to {}", cli.output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
