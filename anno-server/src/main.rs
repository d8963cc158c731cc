//! anno-server - annotation work distribution service
//!
//! Startup order: tracing, config, store, catalog sync from the path
//! manifest, engine load, HTTP serve.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use anno_common::config::ServerConfig;
use anno_server::{build_router, manifest, AppState, Engine, Store};

#[derive(Debug, Parser)]
#[command(name = "anno-server", about = "Annotation work distribution server")]
struct Args {
    /// Path to the TOML config file (falls back to ANNO_CONFIG, then ./anno.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the manifest path from the config file
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Override the bind address from the config file
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting anno-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(path) = args.manifest {
        config.manifest_path = path;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let store = Store::open(&config.db_path).await?;

    let items = manifest::load_manifest(&config.manifest_path)?;
    info!(
        "Manifest {} lists {} work items",
        config.manifest_path.display(),
        items.len()
    );
    manifest::sync_catalog(&store, &items).await?;

    let engine = Arc::new(Engine::load(store).await?);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(engine, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("anno-server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
