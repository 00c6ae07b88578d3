use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use docqa::config::Config;
use docqa::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    about = "Document question-answering service over an uploaded PDF"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "DOCQA_BIND")]
    bind: Option<String>,

    /// API key for the embedding and language-model endpoints
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("BUILD_TIMESTAMP"),
        commit = env!("GIT_HASH"),
        "starting docqa"
    );

    let state = AppState::from_config(&config, &cli.openai_api_key)
        .context("Failed to initialize application state")?;
    let app = server::app(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("listening on http://{}", config.server.bind);
    axum::serve(listener, app).await.context("server shutdown")?;

    Ok(())
}
