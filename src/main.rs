use std::sync::Arc;

use tokio::signal;
use tracing::{debug, info};

use wordref_provider::config::AppConfig;
use wordref_provider::provider::{SearchProvider, XdgOpen};
use wordref_provider::{server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();

    info!("Starting WordReference search provider");
    info!(
        "Endpoint: {}://{} (dictionary={}, synonyms={})",
        config.endpoint.protocol,
        config.endpoint.host,
        config.configuration.dictionary,
        config.configuration.synonyms
    );

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let provider = Arc::new(SearchProvider::new(state, Arc::new(XdgOpen))?);

    let mut phases = provider.session().subscribe_phase();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            debug!("Session phase: {:?}", *phases.borrow_and_update());
        }
    });

    let app = server::router(provider.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Search provider listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    provider.shutdown().await;
    Ok(())
}
