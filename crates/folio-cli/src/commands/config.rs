//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use folio_core::config::{FunctionsConfig, GistConfig, GitHubConfig, JsonBinConfig, PagesConfig};
use folio_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, attempt_timeout_secs, read_order, write_order, simulated, \
     log_file, github.repo, github.branch, github.api_url, gist.api_url, gist.description, \
     jsonbin.endpoint, pages.site_url, functions.base_url";

const REDACTED: &str = "********";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let config = redacted(config);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  attempt_timeout_secs: {}", config.attempt_timeout_secs);
            println!("  read_order:           {}", list(&config.read_order));
            println!("  write_order:          {}", list(&config.write_order));
            println!("  simulated:            {}", list(&config.simulated));
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            match &config.github {
                Some(github) => {
                    println!("  github:    {} ({})", github.repo, github.branch);
                    println!("             api {}", github.api_url);
                    if let Some(token) = &github.token {
                        println!("             token {}", token);
                    }
                }
                None => println!("  github:    (not set)"),
            }
            match &config.gist {
                Some(gist) => println!("  gist:      {} ({})", gist.api_url, gist.description),
                None => println!("  gist:      (not set)"),
            }
            match &config.jsonbin {
                Some(jsonbin) => {
                    println!("  jsonbin:   {}", jsonbin.endpoint);
                    if let Some(key) = &jsonbin.master_key {
                        println!("             master_key {}", key);
                    }
                }
                None => println!("  jsonbin:   (not set)"),
            }
            println!(
                "  pages:     {}",
                config
                    .pages
                    .as_ref()
                    .map(|p| p.site_url.as_str())
                    .unwrap_or("(not set)")
            );
            println!(
                "  functions: {}",
                config
                    .functions
                    .as_ref()
                    .map(|f| f.base_url.as_str())
                    .unwrap_or("(not set)")
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    // Only what the file holds; env overrides must not be written back
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let mut config =
        Config::load_file_only(&save_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one `key = value` setting
///
/// An empty value or `none` clears optional settings. Setting the first
/// field of a backend section creates the section.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let cleared = value.is_empty() || value == "none";

    match key {
        "data_dir" => config.data_dir = value.into(),
        "attempt_timeout_secs" => {
            config.attempt_timeout_secs = value
                .parse()
                .context("Invalid value for attempt_timeout_secs. Use a whole number of seconds.")?;
        }
        "read_order" => config.read_order = names(value),
        "write_order" => config.write_order = names(value),
        "simulated" => config.simulated = names(value),
        "log_file" => config.log_file = (!cleared).then(|| value.into()),
        "github.repo" => {
            if cleared {
                config.github = None;
            } else {
                match config.github.as_mut() {
                    Some(github) => github.repo = value.to_string(),
                    None => config.github = Some(GitHubConfig::new(value)),
                }
            }
        }
        "github.branch" | "github.api_url" => {
            let Some(github) = config.github.as_mut() else {
                bail!("Set github.repo before {}", key);
            };
            if key == "github.branch" {
                github.branch = value.to_string();
            } else {
                github.api_url = value.to_string();
            }
        }
        "gist.api_url" | "gist.description" => {
            if cleared {
                config.gist = None;
            } else {
                let gist = config.gist.get_or_insert_with(GistConfig::default);
                if key == "gist.api_url" {
                    gist.api_url = value.to_string();
                } else {
                    gist.description = value.to_string();
                }
            }
        }
        "jsonbin.endpoint" => {
            if cleared {
                config.jsonbin = None;
            } else {
                config
                    .jsonbin
                    .get_or_insert_with(JsonBinConfig::default)
                    .endpoint = value.to_string();
            }
        }
        "pages.site_url" => {
            config.pages = (!cleared).then(|| PagesConfig {
                site_url: value.to_string(),
            });
        }
        "functions.base_url" => {
            config.functions = (!cleared).then(|| FunctionsConfig {
                base_url: value.to_string(),
            });
        }
        "github.token" | "jsonbin.master_key" => {
            bail!(
                "Credentials are not written to the config file. Use:\n  \
                 folio credential set {} <value>",
                key.split('.').next().unwrap_or(key)
            );
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }

    Ok(())
}

/// Comma-separated backend names
fn names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "none")
        .map(str::to_string)
        .collect()
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "(default)".to_string()
    } else {
        names.join(", ")
    }
}

fn redacted(mut config: Config) -> Config {
    if let Some(github) = config.github.as_mut() {
        if github.token.is_some() {
            github.token = Some(REDACTED.to_string());
        }
    }
    if let Some(jsonbin) = config.jsonbin.as_mut() {
        if jsonbin.master_key.is_some() {
            jsonbin.master_key = Some(REDACTED.to_string());
        }
    }
    config
}
