//! `studymate notes ...`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use studymate_auth::{with_session_refresh, AuthSession, HostedAuthClient};
use studymate_core::{Note, Principal, StudyError};
use studymate_gateway::Services;
use studymate_notes::NoteStore;

use crate::context::AppContext;
use crate::terminal_output::{
    note_info, note_success, render_table, supports_color, Column, DIM, RESET,
};

#[derive(Args)]
pub struct NotesArgs {
    /// Account email (remote notes only)
    #[arg(long, env = "STUDYMATE_EMAIL", global = true)]
    pub email: Option<String>,
    /// Account password (remote notes only)
    #[arg(long, env = "STUDYMATE_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: NotesCommands,
}

#[derive(Subcommand)]
pub enum NotesCommands {
    /// List saved notes, newest first
    List,
    /// Save a note; pass `-` as TEXT to read from stdin
    Add {
        /// The question the note belongs to
        #[arg(short, long)]
        question: String,
        text: String,
    },
    /// Replace a note's content; pass `-` as TEXT to read from stdin
    Edit { id: Uuid, text: String },
    /// Delete a note
    Delete { id: Uuid },
    /// Export all notes to a PDF file
    Export {
        #[arg(short, long, default_value = "StudyMate_Notes.pdf")]
        output: PathBuf,
    },
}

/// Store access as an optional signed-in user.
struct NotesSession {
    store: Arc<dyn NoteStore>,
    auth: Option<(AuthSession, Arc<HostedAuthClient>)>,
}

impl NotesSession {
    async fn open(services: &Services, email: Option<String>, password: Option<String>) -> Result<Self> {
        let auth = match (services.auth.clone(), email, password) {
            (Some(client), Some(email), Some(password)) => {
                let session = client.sign_in(&email, &password).await.map_err(StudyError::from)?;
                Some((session, client))
            }
            _ => None,
        };
        Ok(Self {
            store: services.notes.clone(),
            auth,
        })
    }

    async fn run<T, F, Fut>(&mut self, mut op: F) -> Result<T, StudyError>
    where
        F: FnMut(Arc<dyn NoteStore>, Option<Principal>) -> Fut,
        Fut: std::future::Future<Output = Result<T, StudyError>>,
    {
        let store = self.store.clone();
        match self.auth.as_mut() {
            Some((session, client)) => {
                let client = client.clone();
                with_session_refresh(session, client.as_ref(), |p| op(store.clone(), Some(p))).await
            }
            None => op(store, None).await,
        }
    }
}

async fn read_text(text: String) -> Result<String> {
    if text != "-" {
        return Ok(text);
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("Failed to read note text from stdin")?;
    Ok(buf)
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        note_info("No notes yet.");
        return;
    }
    let columns = [
        Column::new("ID"),
        Column::new("Date"),
        Column::new("Question").max(40),
        Column::new("First point").max(40),
    ];
    let rows: Vec<Vec<String>> = notes
        .iter()
        .map(|n| {
            vec![
                n.id.to_string(),
                n.date_label(),
                n.question.clone(),
                n.content.first().cloned().unwrap_or_default(),
            ]
        })
        .collect();
    print!("{}", render_table(&columns, &rows));
    if supports_color() {
        println!("{DIM}{} note(s){RESET}", notes.len());
    } else {
        println!("{} note(s)", notes.len());
    }
}

pub async fn run(ctx: &AppContext, args: NotesArgs) -> Result<()> {
    let services = ctx.services()?;
    let mut session = NotesSession::open(&services, args.email, args.password).await?;

    match args.command {
        NotesCommands::List => {
            let notes = session
                .run(|store, p| async move { Ok(store.list(p.as_ref()).await?) })
                .await?;
            print_notes(&notes);
        }
        NotesCommands::Add { question, text } => {
            let text = read_text(text).await?;
            let note = session
                .run(|store, p| {
                    let (question, text) = (question.clone(), text.clone());
                    async move { Ok(store.create(p.as_ref(), &question, &text).await?) }
                })
                .await?;
            note_success(&format!("Note saved ({})", note.id));
        }
        NotesCommands::Edit { id, text } => {
            let text = read_text(text).await?;
            session
                .run(|store, p| {
                    let text = text.clone();
                    async move { Ok(store.update(p.as_ref(), id, &text).await?) }
                })
                .await?;
            note_success("Note updated");
        }
        NotesCommands::Delete { id } => {
            session
                .run(|store, p| async move { Ok(store.delete(p.as_ref(), id).await?) })
                .await?;
            note_success("Note deleted");
        }
        NotesCommands::Export { output } => {
            let notes = session
                .run(|store, p| async move { Ok(store.list(p.as_ref()).await?) })
                .await?;
            let bytes = studymate_export::export_notes_pdf(&notes).map_err(StudyError::from)?;
            tokio::fs::write(&output, bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            note_success(&format!("Exported {} note(s) to {}", notes.len(), output.display()));
        }
    }
    Ok(())
}
