//! Show and defaults command handlers

use anyhow::Result;

use folio_core::{ContentStore, DocumentType};

use crate::output::Output;

/// Load a document through the store and print it
pub async fn show(store: &mut ContentStore, doc_type: DocumentType, output: &Output) -> Result<()> {
    let (document, source) = store.load_with_source(doc_type).await;
    output.print_document(doc_type, &document, Some(&source));
    Ok(())
}

/// Print the built-in default for a document type
pub fn defaults(doc_type: DocumentType, output: &Output) -> Result<()> {
    output.print_document(doc_type, &doc_type.default_document(), None);
    Ok(())
}
