use clap::{Parser, Subcommand};
use tower_sessions::MemoryStore;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod messages;
mod routes;
mod session;
mod state;
mod timeline;
mod users;
mod views;

use crate::{config::AppConfig, state::AppState};

/// A small microblogging service.
#[derive(Debug, Parser)]
#[command(name = "minitwit", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Keep users, messages and sessions in process memory.
        #[arg(long)]
        in_memory: bool,
    },
    /// Create the database schema.
    Initdb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "minitwit=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Initdb => {
            let config = AppConfig::from_env()?;
            let pool = db::connect(&config.database_url, 1).await?;
            db::MIGRATOR.run(&pool).await?;
            session::postgres_store(&config.session, 1).await?;
            println!("Initialized the database.");
        }
        Command::Serve { in_memory: true } => {
            tracing::warn!("using in-memory stores; data is lost on exit");
            let app_state = AppState::in_memory(AppConfig::from_env_in_memory()?);
            app::serve(app::build_app(app_state, MemoryStore::default())).await?;
        }
        Command::Serve { in_memory: false } => {
            let app_state = AppState::init(AppConfig::from_env()?).await?;
            let config = &app_state.config;
            let sessions = session::postgres_store(&config.session, config.max_connections).await?;
            let cleanup = session::spawn_expired_deletion(sessions.clone());
            app::serve(app::build_app(app_state, sessions)).await?;
            cleanup.abort();
        }
    }

    Ok(())
}
