//! Authors service entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use libris_core::config::Config;
use libris_core::events::{EventConsumer, KafkaEventPublisher, KafkaMessageSource};
use libris_core::telemetry;

use authors_service::domain::service::AuthorService;
use authors_service::handlers;
use authors_service::http::{self, AppState};
use authors_service::repository::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load("AUTHORS")?;
    telemetry::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        "starting authors service"
    );

    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    tracing::info!("database ready");

    let publisher = Arc::new(KafkaEventPublisher::new(
        config.kafka.clone(),
        config.service.name.clone(),
    ));
    publisher.start().await?;

    let repo = Arc::new(store.clone());
    let registry = handlers::handler_registry(repo.clone(), repo.clone())?;
    let source = KafkaMessageSource::new(config.kafka.clone(), config.consumer_group());
    let consumer = EventConsumer::new(source, registry);

    let shutdown = CancellationToken::new();
    let consumer_task = tokio::spawn(consumer.run(shutdown.clone()));

    let service = Arc::new(AuthorService::new(
        repo.clone(),
        repo,
        publisher.clone(),
    ));

    let app = http::build_router(AppState {
        service,
        service_name: config.service.name.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
    tracing::info!(address = %addr, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    consumer_task.await?;
    publisher.stop().await;
    tracing::info!("shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
