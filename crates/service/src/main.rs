use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use gps_core::{
    load_config, processing::probe_tool, validate_config, BlobStore, Components, DataHubClient,
    Dispatcher, HttpOriginDownloader, ObjectStoreBlobStore, Orchestrator, SanitizedConfig,
    Scheduler, StoreEnvironment, StorePrefixes,
};
use gps_service::{config_fingerprint, create_router, init_logging, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("GPS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let env = StoreEnvironment::from_env().context("Object store environment is incomplete")?;

    let sanitized = SanitizedConfig::from(&config);
    let config_hash = config_fingerprint(&sanitized);
    info!(
        config_hash = %config_hash,
        catalog = %config.catalog.url,
        bucket = %env.bucket,
        input = %env.input_prefix,
        output = %env.output_prefix,
        sync = %env.sync_prefix,
        "Configuration loaded"
    );

    let store: Arc<dyn BlobStore> = Arc::new(
        ObjectStoreBlobStore::from_environment(&env).context("Failed to open object store")?,
    );
    let catalog = DataHubClient::new(config.catalog.clone(), config.credentials.clone())
        .context("Failed to create catalog client")?
        .verbose(config.verbose);
    let downloader = HttpOriginDownloader::new(
        config.credentials.clone(),
        Duration::from_secs(config.catalog.timeout_secs),
    )
    .context("Failed to create origin downloader")?;
    let dispatcher = Dispatcher::from_config(&config.processing);
    info!(platforms = ?dispatcher.platforms(), "Processors registered");

    let tools = &config.processing.tools;
    for tool in [&tools.gdalinfo, &tools.gdal_translate, &tools.gdalwarp, &tools.gpt] {
        if let Err(e) = probe_tool(tool).await {
            warn!("{}; platforms using it will fail", e);
        }
    }

    let orchestrator = Orchestrator::new(
        Components {
            catalog: Arc::new(catalog),
            store,
            downloader: Arc::new(downloader),
            dispatcher,
        },
        config.search.clone(),
        StorePrefixes::from(&env),
        config.scheduler.clone(),
    );
    let scheduler = Scheduler::new(Arc::new(orchestrator), config.scheduler.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = if config.server.enabled {
        let state = Arc::new(AppState::new(
            sanitized,
            config_hash,
            scheduler.status_handle(),
        ));
        let app = create_router(state);
        let addr = SocketAddr::new(config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind status endpoint to {}", addr))?;
        info!("Status endpoint listening on {}", addr);

        let mut stop = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stop| *stop).await;
                })
                .await
        }))
    } else {
        None
    };

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing in-flight work");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await;

    if let Some(server) = server {
        server
            .await
            .context("Status endpoint task panicked")?
            .context("Status endpoint failed")?;
    }

    info!("Service stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
