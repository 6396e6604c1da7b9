//! Game server - HTTP/SSE transport over the everwhen engine.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use everwhen::config::load_config;
use everwhen::narrator::FallbackNarrator;
use everwhen::store::SessionStore;
use everwhen::turn::EngineDeps;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "everwhen-server")]
#[command(about = "HTTP/SSE server for the everwhen session engine")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Engine config file (TOML); defaults apply when missing
    #[arg(long, default_value = "everwhen.toml")]
    config: PathBuf,

    /// Override the data directory from the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("everwhen_server=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    info!(data_dir = %config.data_dir.display(), "starting everwhen-server");

    // The narrative generator is an external capability wired in behind the
    // Narrator trait; without one configured, canned fallbacks carry the
    // session so every phase stays playable.
    let deps = EngineDeps::new(config, Arc::new(FallbackNarrator));
    let state = AppState::new(Arc::new(SessionStore::new(deps)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .route("/sessions/{id}/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
