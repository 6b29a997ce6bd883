use photo_restore_server::{
    create_app,
    database::{Database, MemoryStore, UserStore},
    services::{ImageRestorer, OrderVerifier, PayPalClient, ReplicateClient},
    AppState, Config,
};
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_restore_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn UserStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory user store, data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let db = Database::new(&config.database_url, config.db_max_connections).await?;
        tracing::info!("Running database migrations...");
        db.migrate().await?;
        Arc::new(db)
    };

    if config.replicate.api_token.is_none() {
        tracing::warn!("REPLICATE_API_TOKEN is not set, restorations will fail");
    }
    let restorer: Arc<dyn ImageRestorer> = Arc::new(ReplicateClient::new(&config.replicate)?);

    let order_verifier: Option<Arc<dyn OrderVerifier>> = match config.paypal.credentials() {
        Some((client_id, secret)) => {
            let api_base = config.paypal.default_mode.api_base();
            tracing::info!(mode = %config.paypal.default_mode.as_str(), "PayPal order verification enabled");
            Some(Arc::new(PayPalClient::new(api_base, client_id, secret)?))
        }
        None => {
            tracing::warn!("PayPal credentials missing, payments are applied unverified");
            None
        }
    };

    let port = config.port;
    let state = AppState::new(config, store, restorer, order_verifier)?;
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
