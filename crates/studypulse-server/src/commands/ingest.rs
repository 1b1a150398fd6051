//! The `studypulse ingest` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use comfy_table::{Cell, Table};

use studypulse_core::model::{normalize_email, Role};
use studypulse_server::load_app_config;

pub async fn execute(file: PathBuf, admin_email: String, config_path: Option<PathBuf>) -> Result<()> {
    let admin_email = normalize_email(&admin_email);
    let config = load_app_config(config_path.as_deref())?;
    let storage = super::open_storage(&config).await?;

    let admin = storage
        .users
        .find_by_email(&admin_email)
        .await?
        .with_context(|| format!("no user with email {admin_email}"))?;
    if admin.role != Role::Admin {
        bail!("{admin_email} is not an admin");
    }

    let bytes = std::fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let source = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());

    let service = super::build_service(&config, storage)?;
    eprintln!(
        "Generating questions from {} with {}/{}...",
        file.display(),
        config.llm.default_provider,
        config.llm.default_model
    );
    let report = service.ingest_document(bytes, &source, admin.id).await?;

    let mut table = Table::new();
    table.set_header(vec!["Source", "Chunks", "Skipped", "Rejected", "Questions"]);
    table.add_row(vec![
        Cell::new(&source),
        Cell::new(report.chunks_processed),
        Cell::new(report.chunks_skipped),
        Cell::new(report.rejected),
        Cell::new(report.questions_count),
    ]);
    println!("{table}");

    Ok(())
}
