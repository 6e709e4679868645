// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stacks Rosetta Node
//!
//! Entry point for the `stacks-rosetta-node` binary. Parses CLI arguments,
//! initializes logging and metrics, connects the construction service to
//! a stacks-node, and serves the Rosetta API.
//!
//! - `run`    : start the API and metrics servers
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod rpc_client;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use stacks_rosetta::backend::CachedTokenMetadata;
use stacks_rosetta::config::{MIDDLEWARE_VERSION, ROSETTA_VERSION};
use stacks_rosetta::{RosettaConfig, RosettaService};

use cli::{Commands, RosettaNodeCli};
use metrics::NodeMetrics;
use rpc_client::StacksNodeClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RosettaNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format);

    tracing::info!(
        network = %args.network,
        port = args.port,
        metrics_port = args.metrics_port,
        node = %args.node_rpc_url,
        "starting stacks-rosetta-node"
    );

    let timeout = Duration::from_secs(args.rpc_timeout_secs);
    let config = RosettaConfig::new(args.network)
        .with_ft_metadata_mode(args.ft_metadata_mode)
        .with_collaborator_timeout(timeout);

    // --- Collaborators ---
    let node = Arc::new(
        StacksNodeClient::new(&args.node_rpc_url, timeout).context("failed to build the node RPC client")?,
    );
    let token_metadata = Arc::new(CachedTokenMetadata::new((*node).clone()));
    let service = RosettaService::new(config, node.clone(), node).with_token_metadata(token_metadata);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- API server ---
    let api_router = api::create_router(api::AppState {
        service,
        metrics: Arc::clone(&node_metrics),
    });
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("Rosetta API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            res.context("API server failed")?;
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            res.context("metrics server failed")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("stacks-rosetta-node stopped");
    Ok(())
}

fn print_version() {
    println!("stacks-rosetta-node {}", MIDDLEWARE_VERSION);
    println!("rosetta             {}", ROSETTA_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
