use anyhow::Result;
use std::sync::Arc;
use tokio::signal;

use servers::meteo_logic::{config, downstream, logger, state, upstream};

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    // .env file is optional; real environment always wins
    dotenvy::dotenv().ok();

    let config = config::load_config();
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let app_state = state::AppState::new();

    let (client, eventloop) = upstream::connect(&config)?;
    let publisher: Arc<dyn downstream::CodePublisher> = Arc::new(downstream::MqttPublisher::new(
        client.clone(),
        config.outbound_topic.clone(),
    ));

    let upstream_handle = tokio::spawn(upstream::run(
        config.clone(),
        app_state.clone(),
        Arc::clone(&publisher),
        client,
        eventloop,
        shutdown_tx.subscribe(),
    ));

    let scheduler_handle = tokio::spawn(downstream::run(
        config.clone(),
        app_state.clone(),
        Arc::clone(&publisher),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::error!("Failed to install SIGTERM handler: {e}");
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    // Wait for components to shut down
    let _ = tokio::try_join!(upstream_handle, scheduler_handle);

    log::info!("Shutdown complete.");
    Ok(())
}
