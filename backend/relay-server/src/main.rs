use relay_server::{build_router, logger, metrics, signal};

use relay_auth::JwtValidator;
use relay_ws::{
    AppState, ConnectionConfig, ConnectionLimits, ConnectionRegistry, DispatchConfig,
    DispatchLoop, Metrics, ShutdownCoordinator,
};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // RELAY_* overrides may live in a .env file
    let _ = dotenvy::dotenv();

    // Load and validate configuration
    let config = relay_config::Config::load()?;
    config.validate()?;

    // Construct log file path if configured
    let log_file_path: Option<std::path::PathBuf> = if let Some(ref filename) = config.logging.file
    {
        let config_dir = relay_config::Config::config_dir()?;
        let log_dir = config_dir.join(&config.logging.dir);

        // Ensure log directory exists
        std::fs::create_dir_all(&log_dir)?;

        Some(log_dir.join(filename))
    } else {
        None
    };

    // Initialize logger (before any other logging)
    logger::initialize(config.logging.level, log_file_path, config.logging.colored)?;

    info!("Starting relay-server v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let prometheus = metrics::install_recorder()?;

    // Create JWT validator (optional based on auth.enabled)
    let jwt_validator: Option<Arc<JwtValidator>> = match (config.auth.enabled, &config.auth.jwt_secret) {
        (true, Some(secret)) => {
            info!("JWT: HS256 authentication enabled");
            Some(Arc::new(JwtValidator::with_hs256(secret.as_bytes())))
        }
        _ => {
            warn!("Authentication DISABLED - identity taken from query parameters");
            None
        }
    };

    let queue = relay_queue::connect(&config.queue).await?;

    // Create connection registry with limits
    let registry = ConnectionRegistry::new(
        ConnectionLimits {
            max_total: config.server.max_connections,
        },
        Duration::from_millis(config.websocket.write_timeout_ms),
    );

    let metrics = Metrics::new();
    let shutdown = ShutdownCoordinator::new();

    let dispatch = DispatchLoop::new(
        queue,
        registry.clone(),
        DispatchConfig {
            poll_interval: Duration::from_millis(config.queue.poll_interval_ms),
            max_payload_length: config.delivery.max_payload_length,
            max_frame_length: config.delivery.max_frame_length,
        },
        metrics.clone(),
    );
    let dispatch_task = tokio::spawn(dispatch.run(shutdown.subscribe_guard()));

    let connection_config = ConnectionConfig {
        send_buffer_size: config.websocket.send_buffer_size,
        heartbeat_interval_secs: config.websocket.heartbeat_interval_secs,
        heartbeat_timeout_secs: config.websocket.heartbeat_timeout_secs,
    };

    // Build application state
    let app_state = AppState {
        jwt_validator,
        registry,
        metrics,
        shutdown: shutdown.clone(),
        config: connection_config,
    };

    let app = build_router(app_state, Some(prometheus));

    // Create TCP listener
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", listener.local_addr()?);

    // Spawn signal handler for graceful shutdown
    tokio::spawn(signal::forward_signals(shutdown.clone()));

    // Start server with graceful shutdown
    info!("Server ready to accept connections");
    let mut server_guard = shutdown.subscribe_guard();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_guard.wait().await;
            info!("Stopped accepting connections");
        })
        .await?;

    if let Err(e) = dispatch_task.await {
        error!("Dispatch loop task failed: {e}");
    }

    info!("Graceful shutdown complete");

    Ok(())
}
