//! wsrelay - Entry Point
//!
//! Starts the relay for the configured variant and serves it until Ctrl+C
//! or SIGTERM, then closes every connection.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsrelay::api::ApiServer;
use wsrelay::config::{Config, LogConfig, Variant};
use wsrelay::error::{RelayError, Result};
use wsrelay::relay::{ChatCodec, Codec, Relay, SignalCodec};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log);

    info!(
        "Starting wsrelay ({} variant, delivery: {})",
        config.relay.variant.as_str(),
        config.relay.delivery.as_str()
    );

    match config.relay.variant {
        Variant::Chat => run::<ChatCodec>(config).await,
        Variant::Signal => run::<SignalCodec>(config).await,
    }
}

async fn run<C: Codec>(config: Config) -> Result<()> {
    let relay = Relay::<C::Payload>::start(config.broadcaster());
    let server = ApiServer::<C>::new(config.server.clone(), relay.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(async move { server.run(shutdown_rx).await });

    let result = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            (&mut server_task).await
        }
        joined = &mut server_task => joined,
    };

    // Close every connection whether the server stopped cleanly or not
    relay.shutdown().await;

    let result = result.map_err(|e| RelayError::Internal(e.to_string()))?;
    if let Err(e) = &result {
        error!("Server error: {}", e);
    }

    info!("wsrelay stopped");
    result
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wsrelay={},tower_http=info", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("pretty") {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
