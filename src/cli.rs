use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use reportforge::dictionary::verify_dictionary;
use reportforge::manifest::{MANIFEST_FILE, load_manifest};
use reportforge::schema::{ColumnDescriptor, SchemaHashStore, fingerprint};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "reportforge",
    about = "Schema fingerprints, hash archives and run manifests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the schema digest of a column list
    Fingerprint {
        /// Dataset name every column belongs to
        #[arg(short, long)]
        dataset: String,

        /// JSON array of {"column_name", "data_type", "is_nullable"} objects
        #[arg(short, long)]
        columns: String,

        /// Output directory whose stored digest the result is compared with
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Recompute the data dictionary digest and compare it with the stored one
    VerifyDictionary {
        /// Directory holding the listing and its digest file
        #[arg(short, long)]
        dir: PathBuf,
    },
    /// List archived schema hashes, newest first
    Archives {
        /// Working directory of the report run
        #[arg(short, long, env = "REPORTFORGE_WORKING_DIR", default_value = ".")]
        working_dir: PathBuf,
    },
    /// Summarize a saved run manifest
    ShowManifest {
        /// Path to a manifest.json
        path: PathBuf,
    },
}

/// One entry of `--columns`. Every field is required, so a partial column is
/// rejected before anything is hashed.
#[derive(Deserialize)]
struct ColumnInput {
    column_name: String,
    data_type: String,
    is_nullable: bool,
}

fn parse_columns(dataset: &str, columns: &str) -> Result<Vec<ColumnDescriptor>> {
    let inputs: Vec<ColumnInput> =
        serde_json::from_str(columns).context("Failed to parse --columns as a JSON array")?;

    Ok(inputs
        .iter()
        .map(|c| ColumnDescriptor::new(dataset, &c.column_name, &c.data_type, c.is_nullable))
        .collect())
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Fingerprint {
            dataset,
            columns,
            output_dir,
        } => handle_fingerprint(&dataset, &columns, output_dir.as_deref()),
        Commands::VerifyDictionary { dir } => handle_verify_dictionary(&dir),
        Commands::Archives { working_dir } => handle_archives(&working_dir),
        Commands::ShowManifest { path } => handle_show_manifest(&path),
    }
}

fn handle_fingerprint(dataset: &str, columns: &str, output_dir: Option<&Path>) -> Result<()> {
    let descriptors = parse_columns(dataset, columns)?;
    let digest = fingerprint(dataset, &descriptors)?;
    println!("{digest}");

    if let Some(output_dir) = output_dir {
        // Read-only: the store is never rotated from here.
        let store = SchemaHashStore::new(Path::new("."));
        match store.read_current(output_dir)? {
            None => println!("No stored digest in {} (first run)", output_dir.display()),
            Some(previous) if previous == digest => println!("Schema unchanged"),
            Some(previous) => println!("Schema CHANGED (stored: {previous})"),
        }
    }

    Ok(())
}

fn handle_verify_dictionary(dir: &Path) -> Result<()> {
    let result = verify_dictionary(dir)?;
    println!("{}", result.format_cli());

    if !result.passed {
        anyhow::bail!("Data dictionary verification failed");
    }
    Ok(())
}

fn handle_archives(working_dir: &Path) -> Result<()> {
    let store = SchemaHashStore::new(working_dir);
    let archives = store.list_archives()?;

    if archives.is_empty() {
        println!("No archives in {}", store.archive_dir().display());
        return Ok(());
    }

    for archive in archives {
        println!(
            "{}  {}  {}",
            archive.archived_at.format("%Y-%m-%d %H:%M"),
            archive.digest,
            archive.path.display()
        );
    }
    Ok(())
}

fn handle_show_manifest(path: &Path) -> Result<()> {
    let manifest = load_manifest(path).map_err(|e| {
        if e.is_not_found() {
            anyhow::anyhow!(
                "No manifest at {}; finished runs save {MANIFEST_FILE} in their output directory",
                path.display()
            )
        } else {
            e.into()
        }
    })?;

    println!("Run:         {}", manifest.run_id());
    println!("Report:      {}", manifest.report_title());
    println!("Environment: {}", manifest.environment());
    println!("User:        {}@{}", manifest.user(), manifest.machine());
    println!("Config:      {}", manifest.config_path());
    println!("Started:     {}", manifest.start_utc().to_rfc3339());
    println!("Duration:    {}", manifest.duration_display());
    println!(
        "Status:      {}",
        if manifest.success() { "SUCCESS" } else { "FAILED" }
    );

    println!("\nDatasets ({}):", manifest.datasets().len());
    for metric in manifest.datasets() {
        let flag = if metric.schema_changed() { "  [schema changed]" } else { "" };
        println!(
            "  {:<24} {:>10} rows {:>10.1} ms  {}{flag}",
            metric.name(),
            metric.row_count(),
            metric.duration_ms(),
            metric.output_path().display(),
        );
    }

    if !manifest.warnings().is_empty() {
        println!("\nWarnings ({}):", manifest.warnings().len());
        for warning in manifest.warnings() {
            println!("  - {warning}");
        }
    }

    Ok(())
}
