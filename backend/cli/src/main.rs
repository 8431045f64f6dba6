mod config_cmd;
mod context;
mod explain_cmd;
mod notes_cmd;
mod ocr_cmd;
mod status_cmd;
mod terminal_output;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use studymate_config::defaults::{DEFAULT_BIND, DEFAULT_PORT};
use studymate_config::resolve_data_path;
use studymate_core::{StudyError, Style};
use studymate_gateway::{start_server, GatewayState};

use config_cmd::ConfigCommands;
use context::AppContext;
use notes_cmd::NotesArgs;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "studymate")]
#[command(about = "StudyMate: explanations with math, notes and feedback")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.studymate/config.yaml or $STUDYMATE_CONFIG_DIR/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI and HTTP API
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Explain a concept in the terminal
    Explain {
        subject: String,
        /// Simple or Technical
        #[arg(short, long, default_value = "simple", value_parser = parse_style)]
        style: Style,
        /// Print the explanation as it is generated
        #[arg(long)]
        stream: bool,
    },
    /// Manage saved notes
    Notes(NotesArgs),
    /// Read the text in an image
    Ocr { image: PathBuf },
    /// Show configuration and whether a server is running
    Status,
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn parse_style(s: &str) -> Result<Style, String> {
    s.parse().map_err(|e: StudyError| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli).await {
        match e.downcast_ref::<StudyError>() {
            Some(err) => note_error(&err.user_message()),
            None => note_error(&format!("{e:#}")),
        }
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Config(cmd) => {
            logging::init_console_logger("warn");
            return config_cmd::run(cli.config, cmd).await;
        }
        other => other,
    };

    let ctx = AppContext::load(cli.config).await?;
    if let Commands::Serve { port } = command {
        let log_dir = ctx
            .config
            .logging()
            .dir
            .map(|dir| resolve_data_path(&ctx.config_dir, &dir))
            .unwrap_or_else(|| ctx.config_dir.join("logs"));
        logging::init_logger(&log_dir, &ctx.log_level());
        return run_server(&ctx, port).await;
    }

    logging::init_console_logger(&ctx.log_level());
    match command {
        Commands::Explain { subject, style, stream } => {
            explain_cmd::run(&ctx, &subject, style, stream).await
        }
        Commands::Notes(args) => notes_cmd::run(&ctx, args).await,
        Commands::Ocr { image } => ocr_cmd::run(&ctx, &image).await,
        Commands::Status => status_cmd::run(&ctx).await,
        Commands::Serve { .. } | Commands::Config(_) => Ok(()),
    }
}

async fn run_server(ctx: &AppContext, port: Option<u16>) -> Result<()> {
    let gateway = ctx.config.gateway();
    let bind = gateway.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
    let port = port.or(gateway.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {bind}:{port}"))?;

    let services = ctx.services()?;
    info!(
        %addr,
        notes = services.notes.backend(),
        feedback = services.feedback.name(),
        auth = services.auth.is_some(),
        "Starting StudyMate"
    );
    start_server(addr, GatewayState::new(services)).await
}
