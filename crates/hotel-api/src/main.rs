//! Hotel operations API server.

use hotel_api::config::AppConfig;
use hotel_api::server::{self, AppState};
use hotel_history::Formatter;
use hotel_service::HotelOps;
use hotel_store::{InMemoryDirectory, InMemoryDocumentStore, Timed};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let users = config.load_users()?;
    tracing::info!(users = users.len(), "identity directory seeded");
    let formatter =
        Formatter::new(config.formatter.clone()).with_hints(config.load_display_names()?);

    let timeout = Duration::from_millis(config.store_timeout_ms);
    let store = Arc::new(Timed::new(InMemoryDocumentStore::new(), timeout));
    let directory = Arc::new(Timed::new(InMemoryDirectory::with_users(users), timeout));
    let ops = HotelOps::new(
        store,
        directory,
        config.access.clone(),
        config.history.clone(),
        formatter,
    );

    let app = server::router(Arc::new(AppState { ops: Arc::new(ops) }));
    let addr: SocketAddr = config.listen.parse()?;
    tracing::info!("hotel ops API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
