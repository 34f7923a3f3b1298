// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use yeehub::{DefaultHub, HubConfig};

#[derive(Debug, Parser)]
#[command(name = "yeehub")]
#[command(about = "Discover Yeelight bulbs and toggle them on MQTT command", long_about = None)]
struct Cli {
    /// Configuration file, with or without extension
    #[arg(short, long, default_value = "hub_config")]
    config: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match HubConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %cli.config, error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let hub = match DefaultHub::from_config(&config) {
        Ok(hub) => hub,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Interrupt received, shutting down"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt"),
        }
        let _ = shutdown_tx.send(true);
    });

    hub.run(shutdown_rx).await;
    ExitCode::SUCCESS
}
