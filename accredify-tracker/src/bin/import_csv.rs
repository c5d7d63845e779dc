//! Checklist CSV importer
//!
//! **Usage:**
//! ```bash
//! import-csv checklist.csv --project-name "Hospital Accreditation 2025" [--create-evidence-notes] [--dry-run]
//! ```
//!
//! Gets or creates the named project, then upserts every row. Running it
//! again on the same file changes nothing.

use std::path::PathBuf;

use accredify_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use accredify_tracker::config::MODULE_NAME;
use accredify_tracker::db;
use accredify_tracker::models::ImportOptions;
use accredify_tracker::services::CsvReconciler;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

/// Import a compliance checklist CSV into a project
#[derive(Parser, Debug)]
#[command(name = "import-csv")]
#[command(about = "Import a compliance checklist CSV into a project")]
struct Args {
    /// Path to the checklist CSV file
    csv_path: PathBuf,

    /// Project to import into (created if missing)
    #[arg(long, default_value = "Imported Checklist")]
    project_name: String,

    /// Description for the project
    #[arg(long, default_value = "")]
    project_description: String,

    /// Import only the first N data rows
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Process everything, report counts, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Create note evidence from the "Compliance Evidence" column
    #[arg(long)]
    create_evidence_notes: bool,

    /// Root folder holding the database
    #[arg(long)]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    if !args.csv_path.is_file() {
        bail!("CSV file not found: {}", args.csv_path.display());
    }
    let csv_text = tokio::fs::read_to_string(&args.csv_path)
        .await
        .with_context(|| format!("Failed to read {}", args.csv_path.display()))?;

    let toml_config = TomlConfig::load_or_default(MODULE_NAME);
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml_config(toml_config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    let pool = accredify_common::db::init_database(&initializer.database_path()).await?;

    let project = {
        let mut conn = pool.acquire().await?;
        db::projects::get_or_create(&mut conn, args.project_name.trim(), &args.project_description).await?
    };
    info!(project_id = %project.id, name = %project.name, "Importing into project");

    let options = ImportOptions {
        create_evidence_notes: args.create_evidence_notes,
        limit: args.limit,
        dry_run: args.dry_run,
    };

    let reconciler = CsvReconciler::new(pool.clone());
    let result = reconciler.import_csv(project.id, &csv_text, &options).await?;

    for row_error in &result.errors {
        error!(row = row_error.row, "{}", row_error.error);
    }

    if result.is_file_error() {
        bail!("Import aborted: CSV header rejected");
    }

    println!(
        "created={} updated={} skipped={} evidence_notes={}",
        result.created, result.updated, result.skipped, result.evidence_notes_created
    );
    if args.dry_run {
        println!("dry run: no changes were written");
    }

    Ok(())
}
