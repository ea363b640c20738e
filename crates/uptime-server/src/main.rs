//! Uptime server binary

use uptime_server::{Config, LogFormat, UptimeServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for logging settings)
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    let level = config.logging.level.as_deref().unwrap_or("info");
    match config.logging.format {
        LogFormat::Text => common::logging::init_with_level(level),
        LogFormat::Json => common::logging::init_json_with_level(level),
    }

    tracing::info!(
        domains = config.domains.len(),
        listen_addr = %config.server.listen_addr,
        "Uptime server starting"
    );

    let server = UptimeServer::new(config.to_server_config());
    server.run().await?;

    Ok(())
}
