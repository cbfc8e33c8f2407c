//! Chat client entry point
//!
//! Run with:
//! ```bash
//! BOT_TOKEN=... cargo run -p chat-client
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use chat_client::Client;
use chat_common::{try_init_tracing_with_config, ClientConfig, TracingConfig};
use chat_gateway::Event;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Client stopped");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> anyhow::Result<()> {
    info!(app = %config.app.name, env = ?config.app.env, "Starting chat client");

    let client = Client::connect(config).await?;

    client.on("connect", |event| async move {
        if let Event::Ready(ready) = event.as_ref() {
            info!(
                user = ?ready.user.id(),
                guilds = ready.guilds.len(),
                "Logged in"
            );
        }
        Ok(())
    });
    client.on("message", |event| async move {
        if let Some(message) = event.model() {
            debug!(id = ?message.id(), channel = ?message.channel_id(), "Message received");
        }
        Ok(())
    });

    let shutdown = client.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.trigger();
        }
    });

    client.run().await?;
    info!("Client stopped");
    Ok(())
}
