//! Folio CLI
//!
//! Command-line interface for Folio - portfolio content kept across
//! redundant storage backends.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_core::{Config, DocumentType};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio - portfolio content across redundant backends")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log every backend attempt
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and print a document (projects, skills, about, settings)
    Show {
        doc_type: DocumentType,
    },
    /// Save a document from a JSON file or stdin
    Save {
        doc_type: DocumentType,
        /// JSON file to read (stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Refresh local copies from the remote backends
    Pull {
        /// Only this document (all when omitted)
        doc_type: Option<DocumentType>,
        /// Only pull when a remote changed since the last sync
        #[arg(long, conflicts_with = "doc_type")]
        if_newer: bool,
    },
    /// Print the built-in default for a document
    Defaults {
        doc_type: DocumentType,
    },
    /// Show backends, cache location and last sync
    Status,
    /// Manage backend credentials
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Store a credential (token or key) for a backend
    Set {
        /// Backend name (github, gist, jsonbin)
        backend: String,
        /// Credential value (read from stdin when omitted)
        value: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, write_order, github.repo, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need the store
    match &cli.command {
        Commands::Config { command } => {
            return handle_config_command(command.clone(), config_path, &output);
        }
        Commands::Defaults { doc_type } => {
            return commands::show::defaults(*doc_type, &output);
        }
        _ => {}
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut store = config
        .build_store()
        .context("Failed to set up content store")?;

    match cli.command {
        Commands::Show { doc_type } => commands::show::show(&mut store, doc_type, &output).await,
        Commands::Save { doc_type, file } => {
            commands::save::save(&mut store, doc_type, file.as_deref(), &output).await
        }
        Commands::Pull {
            if_newer: true, ..
        } => commands::pull::pull_if_newer(&mut store, &output).await,
        Commands::Pull { doc_type, .. } => {
            commands::pull::pull(&mut store, doc_type, &output).await
        }
        Commands::Status => commands::status::show(&store, &output),
        Commands::Credential { command } => match command {
            CredentialCommands::Set { backend, value } => {
                commands::credential::set(&mut store, &backend, value, &output)
            }
        },
        Commands::Config { .. } => unreachable!(),   // Handled above
        Commands::Defaults { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// Level comes from FOLIO_LOG, else `debug` with --verbose, else `warn`.
/// Logs go to the configured log file, or stderr.
fn init_logging(config: &Config, verbose: bool) {
    let log_level = std::env::var("FOLIO_LOG")
        .unwrap_or_else(|_| if verbose { "debug" } else { "warn" }.to_string());
    let env_filter = EnvFilter::new(format!("folio_core={},folio_cli={}", log_level, log_level));

    // Ignore the error if a subscriber is already installed
    match &config.log_file {
        Some(path) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_document_type_argument() {
        let cli = Cli::try_parse_from(["folio", "--json", "show", "Skills"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Show {
                doc_type: DocumentType::Skills
            }
        ));

        assert!(Cli::try_parse_from(["folio", "show", "blog"]).is_err());
    }

    #[test]
    fn test_parse_save_and_pull() {
        let cli = Cli::try_parse_from(["folio", "save", "about", "--file", "about.json"]).unwrap();
        match cli.command {
            Commands::Save { doc_type, file } => {
                assert_eq!(doc_type, DocumentType::About);
                assert_eq!(file, Some(PathBuf::from("about.json")));
            }
            _ => panic!("expected save"),
        }

        let cli = Cli::try_parse_from(["folio", "pull", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Pull {
                doc_type: None,
                if_newer: false
            }
        ));
    }

    #[test]
    fn test_parse_pull_if_newer() {
        let cli = Cli::try_parse_from(["folio", "pull", "--if-newer"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pull {
                doc_type: None,
                if_newer: true
            }
        ));

        assert!(Cli::try_parse_from(["folio", "pull", "skills", "--if-newer"]).is_err());
    }

    #[test]
    fn test_parse_global_config_path() {
        let cli =
            Cli::try_parse_from(["folio", "status", "--config", "/tmp/folio.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/folio.toml")));
    }
}
