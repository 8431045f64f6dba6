//! CLI Status Command
//!
//! Reports the effective configuration and whether a server is answering.

use anyhow::Result;
use serde_json::Value;

use studymate_config::defaults::{DEFAULT_BIND, DEFAULT_PORT};

use crate::context::AppContext;
use crate::terminal_output::{note_info, note_warn, render_table, Column};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let config = &ctx.config;
    let llm = config.llm();
    let notes = config.notes();
    let gateway = config.gateway();
    let port = gateway.port.unwrap_or(DEFAULT_PORT);
    let bind = gateway.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());

    println!("\nStudyMate status\n");
    let rows = vec![
        vec!["config".to_string(), ctx.config_path.display().to_string()],
        vec!["model".to_string(), llm.model.unwrap_or_default()],
        vec!["streaming".to_string(), llm.stream.unwrap_or(false).to_string()],
        vec![
            "notes".to_string(),
            format!("{:?}", notes.backend.unwrap_or_default()).to_lowercase(),
        ],
        vec![
            "feedback".to_string(),
            format!("{:?}", config.feedback().sink.unwrap_or_default()).to_lowercase(),
        ],
        vec![
            "sign-in".to_string(),
            if config.supabase.as_ref().and_then(|s| s.url.as_ref()).is_some() {
                "enabled".to_string()
            } else {
                "disabled".to_string()
            },
        ],
    ];
    print!("{}", render_table(&[Column::new("Setting"), Column::new("Value")], &rows));
    println!();

    let url = format!("http://{bind}:{port}/api/health");
    let client = reqwest::Client::new();
    match client.get(&url).send().await {
        Ok(resp) => {
            let body: Value = resp.json().await?;
            note_info(&format!("Server is running at http://{bind}:{port}"));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => note_warn(&format!("StudyMate is not running on {bind}:{port}")),
    }
    Ok(())
}
