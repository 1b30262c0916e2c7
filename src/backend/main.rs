/**
 * Pulsechat Server Entry Point
 *
 * Loads configuration, initializes tracing, and serves the HTTP and
 * WebSocket endpoints until Ctrl-C.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use pulsechat::backend::server::{config::ServerConfig, init::create_app};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pulsechat=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("[Server] Server initialization started");

    let config = ServerConfig::load()?;
    let addr = config.bind_addr.clone();
    let (app, jobs) = create_app(config).await;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[Server] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("[Server] Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("[Server] Shutdown signal received");
        })
        .await?;

    jobs.shutdown();
    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin pulsechat-server --features ssr");
    std::process::exit(1);
}
