mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use solace::config::SolaceConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "solace", version, about = "Encrypted journal and conversation memory")]
struct Cli {
    /// User whose records are opened (defaults to $SOLACE_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Append a message to a session
    Say {
        session: String,
        content: String,
        /// user, assistant, or system
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Show the memory context the model would receive for a session
    Context { session: String },
    /// Regenerate a session's rolling summary if it is due
    Summarize {
        session: String,
        /// Use the keyword summarizer even if an inference command is configured
        #[arg(long)]
        quick: bool,
    },
    /// Check database health
    Doctor,
    /// Delete all of the user's sessions
    Reset,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start a new session
    New {
        #[arg(long)]
        title: Option<String>,
    },
    /// List sessions, most recent first
    List,
    /// Print a session with its messages and summary
    Show { id: String },
    /// Permanently delete a session
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = SolaceConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Doctor = cli.command {
        return cli::doctor::doctor(&config);
    }

    let user = cli::resolve_user(cli.user)?;
    let app = cli::App::open(&config, &user)?;

    match cli.command {
        Command::Session { action } => match action {
            SessionAction::New { title } => cli::session::new(&app, title.as_deref()),
            SessionAction::List => cli::session::list(&app),
            SessionAction::Show { id } => cli::session::show(&app, &id),
            SessionAction::Delete { id } => cli::session::delete(&app, &id),
        },
        Command::Say {
            session,
            content,
            role,
        } => cli::chat::say(&app, &session, &role, &content),
        Command::Context { session } => cli::chat::context(&app, &session),
        Command::Summarize { session, quick } => {
            cli::chat::summarize(&app, &config, &session, quick).await
        }
        Command::Reset => cli::reset::reset(&app),
        Command::Doctor => Ok(()),
    }
}
