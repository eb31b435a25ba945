//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use domain::{CheckoutConfig, EventPublisher};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::NotificationConfig;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Builds the application over `store` and serves it until a shutdown signal.
async fn serve<S: Store>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
    publisher: Arc<dyn EventPublisher>,
) {
    let (users, addresses) = api::demo::directory();
    let state = api::create_default_state(
        store,
        users,
        addresses,
        publisher,
        CheckoutConfig::from_env(),
    );
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Start the notification bus
    let notification_config = NotificationConfig::from_env();
    let bus = Arc::new(notifications::order_notifications(&notification_config));
    let publisher: Arc<dyn EventPublisher> = bus.clone();

    // 4. Open the store and serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let mut store = PostgresStore::new(pool);
            if let Some(timeout) = config.lock_timeout {
                store = store.with_lock_timeout(timeout);
            }
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");

            serve(store, &config, metrics_handle, publisher).await;
        }
        None => {
            let store = match config.lock_timeout {
                Some(timeout) => InMemoryStore::with_lock_timeout(timeout),
                None => InMemoryStore::new(),
            };
            for product in api::demo::catalog() {
                store
                    .put_product(product)
                    .await
                    .expect("failed to seed catalog");
            }
            tracing::info!("using in-memory store with demo catalog");

            serve(store, &config, metrics_handle, publisher).await;
        }
    }

    // 5. Drain notifications queued before shutdown
    bus.shutdown(notification_config.shutdown_grace).await;

    tracing::info!("server shut down gracefully");
}
