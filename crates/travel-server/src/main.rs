mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use travel_api::auth::{AppState, AppStateInner};
use travel_api::build_router;
use travel_api::storage::ImageStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel=debug,travel_api=debug,travel_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and image storage
    let db = travel_db::Database::open(&config.db_path)?;
    let images = ImageStore::new(config.upload_dir.clone(), &config.public_url).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        images,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: config.token_ttl(),
        max_upload_bytes: config.max_upload_bytes(),
    });

    if let Some(dir) = &config.static_dir {
        info!("Serving frontend from {}", dir.display());
    }
    let app = build_router(state, config.static_dir.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Travel journal server listening on {}", addr);
    info!("Public image URL base: {}", config.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
