//! Roomlink lobby server.
//!
//! Reads `config.toml` (creating it on first run), applies command-line
//! overrides, and serves until Ctrl-C or `!exit` on stdin.

use clap::Parser;
use roomlink::{CliArgs, Config, RoomlinkServer};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut config = Config::load_or_create(&args.config_dir())?;
    config.apply_cli_overrides(&args);
    roomlink::init_tracing(config.log_filter());

    let addr = config.socket_addr()?;
    let server = RoomlinkServer::builder()
        .bind(&addr.to_string())
        .build()
        .await?;

    server.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Completes on Ctrl-C or when an operator types `!exit`.
async fn shutdown_signal() {
    let console = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim() == "!exit" => break,
                Ok(Some(_)) => {}
                // stdin closed or unreadable: leave shutdown to Ctrl-C.
                Ok(None) | Err(_) => std::future::pending::<()>().await,
            }
        }
    };

    tokio::select! {
        _ = console => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
            }
        }
    }
}
