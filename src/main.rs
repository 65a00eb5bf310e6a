use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use tls_ping_responder::config::{load_config, validation::validate_config, ConfigError};
use tls_ping_responder::lifecycle::signals;
use tls_ping_responder::lifecycle::startup::{network_channel, ResponderTask};
use tls_ping_responder::observability::logging;
use tls_ping_responder::{ResponderConfig, Shutdown};

#[derive(Parser)]
#[command(name = "tls-ping-responder")]
#[command(about = "Mutual-TLS ping responder", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResponderConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability)?;

    tracing::info!("tls-ping-responder v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backlog = config.listener.backlog,
        fragment_size = config.tls.fragment_size,
        embedded_identity = config.tls.identity.is_none(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let (monitor, ready) = network_channel();
    let task = ResponderTask::launch(ready, config.clone(), &shutdown);

    // On a hosted OS the network stack is already up once we get here.
    let bind_addr: SocketAddr = config.listener.bind_address.parse()?;
    monitor.station_got_ip(bind_addr.ip());

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match signals::wait_for_signal().await {
            Ok(name) => {
                tracing::info!(signal = name, "Signal received, shutting down");
                signal_shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
        }
    });

    task.join().await?;
    drop(monitor);

    tracing::info!("Shutdown complete");
    Ok(())
}
