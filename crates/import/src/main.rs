//! Geoparse annotation importer
//!
//! Loads an annotator export into a named project:
//! 1. Loads configuration and connects to the store
//! 2. Creates missing tables
//! 3. Imports the file's references and referents under a label
//!
//! Usage: geoparse-import <project> <annotations.json> <label> [--create-documents]

use anyhow::Context;
use clap::Parser;
use geoparse_core::{
    config::AppConfig,
    db::{schema, DbPool},
    metrics, observability, Project, Repository, VERSION,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "geoparse-import")]
#[command(about = "Load an annotation export into a geoparse project", long_about = None)]
#[command(version)]
struct Args {
    /// Project name (created if absent)
    project: String,

    /// Annotation export (JSON)
    path: PathBuf,

    /// Label of the manual recognizer/resolver the annotations are stored under
    label: String,

    /// Also create the exported texts as documents of the project
    #[arg(long)]
    create_documents: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    observability::init_tracing(&config.observability);
    metrics::register_metrics();

    info!("Starting Geoparse Import v{}", VERSION);

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    schema::bootstrap(db.write()).await?;

    let repository = Repository::new(db);
    let project =
        Project::load_with_settings(repository, &args.project, config.pipeline.clone()).await?;

    project
        .load_annotations(&args.path, &args.label, args.create_documents)
        .await
        .with_context(|| format!("Failed to import {}", args.path.display()))?;

    info!(project = %project.name(), label = %args.label, "Import complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_positional_and_flag() {
        let args = Args::try_parse_from([
            "geoparse-import",
            "lgl",
            "exports/lgl.json",
            "gold",
            "--create-documents",
        ])
        .unwrap();

        assert_eq!(args.project, "lgl");
        assert_eq!(args.path, PathBuf::from("exports/lgl.json"));
        assert_eq!(args.label, "gold");
        assert!(args.create_documents);
    }

    #[test]
    fn test_args_require_label() {
        assert!(Args::try_parse_from(["geoparse-import", "lgl", "exports/lgl.json"]).is_err());

        let args = Args::try_parse_from(["geoparse-import", "lgl", "a.json", "gold"]).unwrap();
        assert!(!args.create_documents);
    }
}
