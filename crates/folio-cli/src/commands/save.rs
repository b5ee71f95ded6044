//! Save command handler

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use folio_core::{ContentDocument, ContentStore, DocumentType, StorageError};

use crate::output::Output;

/// Save a document read from `file` (or stdin) through the store
///
/// A save that only reached the local cache still succeeds; the report says
/// so. Only failing to write the local cache is an error.
pub async fn save(
    store: &mut ContentStore,
    doc_type: DocumentType,
    file: Option<&Path>,
    output: &Output,
) -> Result<()> {
    let document = match file {
        Some(path) => read_document_file(path)?,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read document from stdin")?;
            parse_document(&input).context("Invalid JSON on stdin")?
        }
    };

    let report = store
        .save(doc_type, &document)
        .await
        .map_err(with_suggestion)?;
    output.print_report(&report);
    Ok(())
}

fn read_document_file(path: &Path) -> Result<ContentDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document file: {:?}", path))?;
    parse_document(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn parse_document(input: &str) -> Result<ContentDocument> {
    if input.trim().is_empty() {
        return Err(anyhow!("document is empty"));
    }
    Ok(serde_json::from_str(input)?)
}

fn with_suggestion(error: StorageError) -> anyhow::Error {
    match error.recovery_suggestion() {
        Some(hint) => anyhow!("Failed to write local cache: {}\n  {}", error, hint),
        None => anyhow!("Failed to write local cache: {}", error),
    }
}
