//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::SessionBlueprint;
use occupancy::FaultConfig;

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::session::{Session, SessionOptions};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(max_ticks) = args.max_ticks {
        info!(max_ticks, "Overriding max_ticks from CLI");
        blueprint.session.max_ticks = max_ticks.max(1);
    }
    if let Some(timeout_ms) = args.request_timeout_ms {
        info!(timeout_ms, "Overriding request timeout from CLI");
        blueprint.session.request_timeout_ms = timeout_ms;
    }

    info!(
        session = %blueprint.session.name,
        vehicles = blueprint.vehicles.len(),
        agents = blueprint.agents.len(),
        script_steps = blueprint.script.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::install_prometheus(args.metrics_port)?;
    }

    let session = Session::new(SessionOptions {
        blueprint,
        faults: FaultConfig {
            stall_authority_requests: args.stall_authority_requests,
            stall_boarding_requests: args.stall_boarding_requests,
            drop_passenger_removals: args.drop_passenger_removals,
        },
        paced: !args.fast,
    });

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting session...");

    // Run session with shutdown signal
    tokio::select! {
        result = session.run() => {
            let stats = result.context("Session execution failed")?;
            info!(
                ticks = stats.ticks,
                duration_secs = stats.duration.as_secs_f64(),
                ticks_per_second = format!("{:.2}", stats.ticks_per_second()),
                "Session completed successfully"
            );

            // Print detailed statistics
            stats.print_summary();
        }
        signal = shutdown_signal => {
            signal?;
            warn!("Received shutdown signal, stopping session...");
        }
    }

    info!("coride finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn setup_shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    let session = &blueprint.session;
    println!("\n=== Configuration Summary ===\n");
    println!("Session:");
    println!("  Name: {}", session.name);
    println!("  Host: {}", session.host_id);
    println!(
        "  Physics: {} Hz for {} ticks",
        session.physics_hz, session.max_ticks
    );
    match session.request_timeout() {
        Some(timeout) => println!("  Request timeout: {} ms", timeout.as_millis()),
        None => println!("  Request timeout: none"),
    }

    println!("\nVehicles ({}):", blueprint.vehicles.len());
    for vehicle in &blueprint.vehicles {
        println!(
            "  - {} at {:?}, top speed {} m/s",
            vehicle.id, vehicle.spawn.position, vehicle.dynamics.top_speed
        );
    }

    println!("\nAgents ({}):", blueprint.agents.len());
    for agent in &blueprint.agents {
        println!("  - {}", agent.id);
    }

    println!("\nScript: {} steps", blueprint.script.len());
    println!();
}
