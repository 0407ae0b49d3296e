//! Actor - real-time planning agent for Trailblazer
//!
//! A long-running process that:
//! 1. Generates a seeded grid world from the central configuration
//! 2. Alternates fixed-budget planner cycles with resume instructions
//! 3. Moves the agent by re-rooting the search tree until the goal is reached
//! 4. Writes a run summary to `<data_dir>/planner_stats.json`

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod agent;
mod config;
mod stats;

use crate::agent::Agent;
use crate::config::Config;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    eprintln!("Actor starting...");

    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let max_cycles_description = if config.max_cycles < 0 {
        "unlimited".to_string()
    } else {
        config.max_cycles.to_string()
    };
    info!(
        time_budget_ms = config.time_budget_ms,
        "Agent will plan for up to {} cycles", max_cycles_description
    );

    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let mut agent = Agent::new(config, Arc::clone(&shutdown_signal))?;

    // Setup graceful shutdown
    let shutdown_handle = tokio::spawn({
        let shutdown_signal = Arc::clone(&shutdown_signal);
        async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received, stopping agent...");
                    shutdown_signal.store(true, Ordering::Relaxed);
                }
                Err(e) => warn!("Failed to listen for ctrl+c: {}", e),
            }
        }
    });

    // The planner loop is CPU bound
    let run_result = tokio::task::spawn_blocking(move || agent.run()).await?;

    shutdown_handle.abort();

    match run_result {
        Ok(reason) => {
            info!(?reason, "Actor completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {}", e);
            Err(e)
        }
    }
}
