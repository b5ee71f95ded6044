//! Pull command handler

use anyhow::{Context, Result};

use folio_core::{ContentStore, DocumentType};

use crate::output::Output;

/// Refresh one document (or all of them) from the remotes
pub async fn pull(
    store: &mut ContentStore,
    doc_type: Option<DocumentType>,
    output: &Output,
) -> Result<()> {
    let results = match doc_type {
        Some(doc_type) => {
            let backend = store
                .refresh(doc_type)
                .await
                .with_context(|| format!("Failed to update local copy of {}", doc_type))?;
            vec![(doc_type, backend)]
        }
        None => store
            .refresh_all()
            .await
            .context("Failed to update local copies")?,
    };

    output.print_pull(&results);
    Ok(())
}

/// Refresh everything, but only when a remote changed since the last sync
pub async fn pull_if_newer(store: &mut ContentStore, output: &Output) -> Result<()> {
    let check = store
        .check_for_updates()
        .await
        .context("Failed to update local copies")?;
    output.print_update_check(&check);
    Ok(())
}
