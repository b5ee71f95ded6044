//! Credential command handler

use std::io::{self, BufRead};

use anyhow::{bail, Context, Result};

use folio_core::ContentStore;

use crate::output::Output;

/// Remember a credential for a backend
///
/// When no value is given it is read from the first line of stdin, which
/// keeps tokens out of shell history.
pub fn set(
    store: &mut ContentStore,
    backend: &str,
    value: Option<String>,
    output: &Output,
) -> Result<()> {
    let value = match value {
        Some(value) => value,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read credential from stdin")?;
            line
        }
    };
    if value.trim().is_empty() {
        bail!("No credential given for '{}'", backend);
    }

    store
        .set_credential(backend, &value)
        .with_context(|| format!("Failed to store credential for '{}'", backend))?;

    output.success(&format!("Stored credential for {}", backend));
    Ok(())
}
