//! Room gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p rooms-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use rooms_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration before tracing so the log format can follow APP_ENV
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        namespace = %config.adapter.namespace,
        relay = config.adapter.relay,
        "Starting room gateway..."
    );

    rooms_gateway::run(config).await?;

    Ok(())
}
