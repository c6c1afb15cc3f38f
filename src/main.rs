use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use log::info;

use jsonl2csv::auth::MetadataTokenProvider;
use jsonl2csv::config::Config;
use jsonl2csv::gcs::GcsStore;
use jsonl2csv::llm::VertexClient;
use jsonl2csv::server::{AppState, app};

#[derive(Debug, Parser)]
#[command(name = "jsonl2csv", about = "AI-assisted JSONL to CSV conversion service")]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

fn setup_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.listen_port = port;
    }
    setup_logging(&config);
    config.validate().context("Invalid configuration")?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;

    let tokens = Arc::new(MetadataTokenProvider::new(http.clone()));
    let model = Arc::new(VertexClient::new(http.clone(), tokens.clone(), &config));
    let store = Arc::new(GcsStore::new(http, tokens));

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let state = Arc::new(AppState {
        config,
        model,
        store,
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
