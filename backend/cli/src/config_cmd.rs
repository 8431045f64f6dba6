//! `studymate config show|init`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use studymate_config::{load_config, redact, validate, write_config, LlmConfig, StudyMateConfig};

use crate::context::locate;
use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file with secrets masked, plus validation results
    Show,
    /// Write a starter config file that reads the API key from the environment
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(explicit: Option<PathBuf>, cmd: ConfigCommands) -> Result<()> {
    let (_, path) = locate(explicit);
    match cmd {
        ConfigCommands::Show => {
            let config = load_config(&path).await?;
            note_info(&format!("Config file: {}", path.display()));
            let value = serde_json::to_value(&config)?;
            println!("{}", serde_yaml::to_string(&redact(&value))?);

            let report = validate(&studymate_config::apply_all_defaults(config));
            for warning in &report.warnings {
                note_warn(&warning.to_string());
            }
            for error in &report.errors {
                note_error(&error.to_string());
            }
            if report.is_valid() {
                note_success("Configuration is valid");
            }
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                note_warn(&format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                ));
                return Ok(());
            }
            let starter = StudyMateConfig {
                llm: Some(LlmConfig {
                    api_key: Some("${OPENROUTER_API_KEY}".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            };
            write_config(&starter, &path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            note_success(&format!("Wrote {}", path.display()));
        }
    }
    Ok(())
}
