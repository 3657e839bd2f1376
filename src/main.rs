use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fluento::api::{ApiServerBuilder, ModelInfo};
use fluento::db::{self, SessionRepo, UserRepo};
use fluento::{CompletionProvider, Config, ConversationManager, OpenAiProvider};

/// Fluento - conversation service for the Fluento AI language tutor
#[derive(Parser)]
#[command(name = "fluento", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to ~/.config/fluento/config.toml)
    #[arg(short, long, env = "FLUENTO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Send one message to the tutor and print the reply
    Chat {
        /// User ID the turn is recorded for
        #[arg(short, long)]
        user: String,
        /// Session to continue
        #[arg(short, long)]
        session: Option<String>,
        /// Message text
        message: String,
    },
    /// List a user's chat sessions
    Sessions {
        /// User ID
        #[arg(short, long)]
        user: String,
    },
    /// Print the messages of a session
    History {
        /// User ID owning the session
        #[arg(short, long)]
        user: String,
        /// Session ID
        session: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,fluento=info",
        1 => "info,fluento=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Chat {
            user,
            session,
            message,
        } => chat(&config, &user, session.as_deref(), &message).await,
        Command::Sessions { user } => list_sessions(&config, &user),
        Command::History { user, session } => history(&config, &user, &session),
    }
}

/// Wire the store and provider into a manager
fn build_manager(config: &Config, pool: &db::DbPool) -> anyhow::Result<ConversationManager> {
    let provider: Arc<dyn CompletionProvider> =
        Arc::new(OpenAiProvider::new(config.openai_config()?)?);
    let store = Arc::new(SessionRepo::new(pool.clone()));

    Ok(ConversationManager::with_config(
        store,
        provider,
        config.conversation_config(),
    ))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::init(config.database_path())?;
    let manager = build_manager(&config, &pool)?;

    tracing::info!(
        port = config.api_server.port,
        model = %config.llm.model,
        context_window = config.context_window,
        "starting fluento"
    );

    let server = ApiServerBuilder::new(pool, manager, config.api_server.port)
        .api_key(config.api_server.api_key.clone())
        .rate_limit(config.api_server.rate_limit_per_minute)
        .model_info(ModelInfo {
            model_id: config.llm.model.clone(),
            provider: "openai".to_string(),
        })
        .build();

    server.run().await?;
    Ok(())
}

async fn chat(
    config: &Config,
    user: &str,
    session: Option<&str>,
    message: &str,
) -> anyhow::Result<()> {
    let pool = db::init(config.database_path())?;
    let manager = build_manager(config, &pool)?;

    let outcome = manager.handle_turn(Some(user), session, message).await?;

    println!("{}", outcome.reply);
    println!("\n(session {})", outcome.session_id);
    Ok(())
}

fn list_sessions(config: &Config, user: &str) -> anyhow::Result<()> {
    let pool = db::init(config.database_path())?;
    if UserRepo::new(pool.clone()).find(user)?.is_none() {
        println!("Unknown user {user}");
        return Ok(());
    }
    let repo = SessionRepo::new(pool);

    let sessions = repo.list_for_user(user)?;
    if sessions.is_empty() {
        println!("No sessions for user {user}");
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}  {}  (last active {})",
            session.id,
            session.title,
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn history(config: &Config, user: &str, session_id: &str) -> anyhow::Result<()> {
    let pool = db::init(config.database_path())?;
    let repo = SessionRepo::new(pool);

    let Some(session) = repo.find(session_id, user)? else {
        anyhow::bail!("session {session_id} not found for user {user}");
    };

    println!("{}", session.title);
    println!("---");
    for message in repo.messages(&session.id)? {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.role.as_str(),
            message.content
        );
    }
    Ok(())
}
