//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use folio_core::store::EntryStatus;
use folio_core::{
    AttemptStatus, ContentDocument, DocumentType, LoadSource, SaveOutcome, SaveReport, StoreStatus,
    UpdateCheck,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a document, noting where it came from when known
    pub fn print_document(
        &self,
        doc_type: DocumentType,
        document: &ContentDocument,
        source: Option<&LoadSource>,
    ) {
        match self.format {
            OutputFormat::Human => {
                if let Some(source) = source {
                    println!("{} (from {})", doc_type, source);
                    println!();
                }
                println!("{}", pretty(document));
            }
            OutputFormat::Json => {
                let mut body = json!({
                    "type": doc_type,
                    "document": document,
                });
                if let Some(source) = source {
                    body["source"] = source_json(source);
                }
                println!("{}", pretty(&body));
            }
            OutputFormat::Quiet => {
                println!("{}", document);
            }
        }
    }

    /// Print the per-backend account of a save
    pub fn print_report(&self, report: &SaveReport) {
        let outcome = report.outcome();
        match self.format {
            OutputFormat::Human => {
                for attempt in &report.attempts {
                    let marker = match attempt.status {
                        AttemptStatus::Accepted => "✓",
                        AttemptStatus::Failed(_) => "✗",
                        AttemptStatus::Skipped(_) => "-",
                    };
                    match attempt.status.detail() {
                        Some(detail) => println!("  {} {}: {}", marker, attempt.backend, detail),
                        None => println!("  {} {}", marker, attempt.backend),
                    }
                }
                match outcome {
                    SaveOutcome::Durable => println!(
                        "✓ Saved {} to {}",
                        report.doc_type,
                        report.durable_backends().join(", ")
                    ),
                    SaveOutcome::LocalOnly => eprintln!(
                        "⚠ Saved {} locally only; no durable backend accepted it",
                        report.doc_type
                    ),
                }
            }
            OutputFormat::Json => {
                let attempts: Vec<Value> = report
                    .attempts
                    .iter()
                    .map(|a| {
                        json!({
                            "backend": a.backend,
                            "durability": a.durability,
                            "status": a.status.label(),
                            "detail": a.status.detail(),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    pretty(&json!({
                        "type": report.doc_type,
                        "outcome": outcome,
                        "saved_at": report.saved_at.to_rfc3339(),
                        "attempts": attempts,
                    }))
                );
            }
            OutputFormat::Quiet => {
                println!("{}", outcome_label(outcome));
            }
        }
    }

    /// Print the result of refreshing documents from the remotes
    pub fn print_pull(&self, results: &[(DocumentType, Option<String>)]) {
        match self.format {
            OutputFormat::Human => {
                for (doc_type, backend) in results {
                    match backend {
                        Some(backend) => println!("✓ {} updated from {}", doc_type, backend),
                        None => println!("- {} not found on any remote, local copy kept", doc_type),
                    }
                }
            }
            OutputFormat::Json => {
                let body: Vec<Value> = results
                    .iter()
                    .map(|(doc_type, backend)| json!({"type": doc_type, "backend": backend}))
                    .collect();
                println!("{}", pretty(&Value::Array(body)));
            }
            OutputFormat::Quiet => {
                for (doc_type, backend) in results {
                    if backend.is_some() {
                        println!("{}", doc_type);
                    }
                }
            }
        }
    }

    /// Print what `pull --if-newer` found, and what it pulled
    pub fn print_update_check(&self, check: &UpdateCheck) {
        match self.format {
            OutputFormat::Human => match check {
                UpdateCheck::Unknown => {
                    println!("No backend can tell when it last changed; run `folio pull` to refresh anyway")
                }
                UpdateCheck::UpToDate { remote, last_sync } => println!(
                    "Up to date (remote changed {}, last sync {})",
                    timestamp(remote),
                    timestamp(last_sync)
                ),
                UpdateCheck::Refreshed { remote, documents } => {
                    println!("Remote changed {}, pulling", timestamp(remote));
                    self.print_pull(documents);
                }
            },
            OutputFormat::Json => println!("{}", pretty(&update_check_json(check))),
            OutputFormat::Quiet => {
                if let UpdateCheck::Refreshed { documents, .. } = check {
                    self.print_pull(documents);
                }
            }
        }
    }

    /// Print backend entries, cache location and last sync
    pub fn print_status(&self, status: &StoreStatus) {
        match self.format {
            OutputFormat::Human => {
                println!("Folio Status");
                println!("============");
                println!();
                println!("Backends:");
                if status.entries.is_empty() {
                    println!("  (none configured, saves stay local)");
                }
                for entry in &status.entries {
                    println!("  {}", entry_line(entry));
                }
                println!();
                println!("  Read order:  {}", order_line(&status.read_order));
                println!("  Write order: {}", order_line(&status.write_order));
                println!();
                println!("Cache:");
                println!(
                    "  Location:  {}",
                    status
                        .cache_location
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(in memory)".to_string())
                );
                println!(
                    "  Last sync: {}",
                    status
                        .last_sync
                        .as_ref()
                        .map(timestamp)
                        .unwrap_or_else(|| "never".to_string())
                );
            }
            OutputFormat::Json => {
                let body = serde_json::to_value(status).unwrap_or(Value::Null);
                println!("{}", pretty(&body));
            }
            OutputFormat::Quiet => {
                for entry in &status.entries {
                    if entry.available {
                        println!("{}", entry.name);
                    }
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn update_check_json(check: &UpdateCheck) -> Value {
    match check {
        UpdateCheck::Unknown => json!({"status": "unknown"}),
        UpdateCheck::UpToDate { remote, last_sync } => json!({
            "status": "up_to_date",
            "remote_changed": remote.to_rfc3339(),
            "last_sync": last_sync.to_rfc3339(),
        }),
        UpdateCheck::Refreshed { remote, documents } => {
            let pulled: Vec<Value> = documents
                .iter()
                .map(|(doc_type, backend)| json!({"type": doc_type, "backend": backend}))
                .collect();
            json!({
                "status": "refreshed",
                "remote_changed": remote.to_rfc3339(),
                "documents": pulled,
            })
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn source_json(source: &LoadSource) -> Value {
    match source {
        LoadSource::Cache => json!("cache"),
        LoadSource::Remote(name) => json!(name),
        LoadSource::Default => json!("default"),
    }
}

fn outcome_label(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Durable => "durable",
        SaveOutcome::LocalOnly => "local_only",
    }
}

fn entry_line(entry: &EntryStatus) -> String {
    let mut notes = vec![format!("{:?}", entry.state).to_lowercase()];
    if !entry.writable {
        notes.push("read-only".to_string());
    }
    if entry.durability == folio_core::Durability::Simulated {
        notes.push("simulated".to_string());
    }
    if !entry.available {
        notes.push("no credential".to_string());
    }
    format!("{:<10} {}", entry.name, notes.join(", "))
}

fn order_line(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(" → ")
    }
}
