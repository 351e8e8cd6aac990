#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use parley_server::config;
use parley_server::logging;
use parley_server::server::ChatServer;
use parley_server::websocket;
use std::net::SocketAddr;

/// Parley -- real-time chat server with JWT-authenticated WebSocket sessions
#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(about = "Real-time chat server: rooms, ordered message history, live broadcast")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON, secret redacted) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg.redacted())
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: {:?}", cfg.storage.backend);
                println!("  History limit: {}", cfg.server.history_limit);
                println!("  Max text length: {}", cfg.server.max_text_length);
                println!("  Announce disconnect: {}", cfg.server.announce_disconnect);
                println!("  CORS origins: {}", cfg.security.cors_origins);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e:#}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    // Dropping the guard would lose buffered file log lines.
    let _log_guard = logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let server = ChatServer::from_config(&cfg).await?;
    tracing::info!(
        %addr,
        backend = ?cfg.storage.backend,
        cors_origins = %cfg.security.cors_origins,
        "Chat server initialized"
    );

    websocket::run_server(addr, server, &cfg.security).await
}
