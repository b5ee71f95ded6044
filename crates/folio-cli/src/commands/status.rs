//! Status command handler

use anyhow::Result;

use folio_core::ContentStore;

use crate::output::Output;

/// Show backend entries, cache location and last sync
pub fn show(store: &ContentStore, output: &Output) -> Result<()> {
    output.print_status(&store.status());
    Ok(())
}
