//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DynamicsConfig, SessionBlueprint};

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session: SessionInfo,
    vehicles: Vec<VehicleInfo>,
    agents: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    script: Vec<StepInfo>,
}

#[derive(Serialize)]
struct SessionInfo {
    name: String,
    host_id: String,
    physics_hz: f64,
    gravity: f32,
    ground_slope_deg: f32,
    request_timeout_ms: u64,
    max_ticks: u64,
}

#[derive(Serialize)]
struct VehicleInfo {
    id: String,
    spawn: [f32; 3],
    yaw_deg: f32,
    mass: f32,
    wheels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamics: Option<DynamicsConfig>,
}

#[derive(Serialize)]
struct StepInfo {
    tick: u64,
    agent: String,
    action: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let session = &blueprint.session;

    let vehicles = blueprint
        .vehicles
        .iter()
        .map(|v| VehicleInfo {
            id: v.id.to_string(),
            spawn: v.spawn.position,
            yaw_deg: v.spawn.yaw_deg,
            mass: v.chassis.mass,
            wheels: v.wheels.iter().map(|w| w.role.as_str().to_string()).collect(),
            dynamics: args.dynamics.then(|| v.dynamics.clone()),
        })
        .collect();

    let script = if args.script {
        blueprint
            .script
            .iter()
            .map(|step| StepInfo {
                tick: step.tick,
                agent: step.agent.to_string(),
                action: format!("{:?}", step.action),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        session: SessionInfo {
            name: session.name.clone(),
            host_id: session.host_id.to_string(),
            physics_hz: session.physics_hz,
            gravity: session.gravity,
            ground_slope_deg: session.ground_slope_deg,
            request_timeout_ms: session.request_timeout_ms,
            max_ticks: session.max_ticks,
        },
        vehicles,
        agents: blueprint.agents.iter().map(|a| a.id.to_string()).collect(),
        script,
    }
}

fn print_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) {
    let session = &blueprint.session;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   coride Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Session");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", session.name);
    println!("   ├─ Host: {}", session.host_id);
    println!("   ├─ Physics: {} Hz, gravity {}", session.physics_hz, session.gravity);
    println!("   ├─ Ground slope: {}°", session.ground_slope_deg);
    match session.request_timeout() {
        Some(timeout) => println!("   └─ Request timeout: {} ms", timeout.as_millis()),
        None => println!("   └─ Request timeout: none"),
    }

    println!("\n🚗 Vehicles ({})", blueprint.vehicles.len());
    for (i, vehicle) in blueprint.vehicles.iter().enumerate() {
        let is_last = i == blueprint.vehicles.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} at {:?} ({} kg)",
            prefix, vehicle.id, vehicle.spawn.position, vehicle.chassis.mass
        );

        if args.dynamics {
            let d = &vehicle.dynamics;
            println!(
                "   {}  ├─ Top speed: {} m/s, power {}",
                child_prefix, d.top_speed, d.acceleration_power
            );
            println!(
                "   {}  ├─ Four-wheel steering: {} (crab: {})",
                child_prefix, d.four_wheel_steering, d.crab_steer_at_high_speeds
            );
            println!(
                "   {}  └─ Suspension: rest {} m, spring {}, damper {}",
                child_prefix,
                d.suspension.rest_distance,
                d.suspension.spring_strength,
                d.suspension.spring_damper
            );
        } else {
            println!("   {}  └─ {} wheels", child_prefix, vehicle.wheels.len());
        }
    }

    println!("\n🧍 Agents ({})", blueprint.agents.len());
    for (i, agent) in blueprint.agents.iter().enumerate() {
        let prefix = if i == blueprint.agents.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}", prefix, agent.id);
    }

    if args.script && !blueprint.script.is_empty() {
        println!("\n📜 Script ({})", blueprint.script.len());
        for (i, step) in blueprint.script.iter().enumerate() {
            let prefix = if i == blueprint.script.len() - 1 { "└─" } else { "├─" };
            println!("   {} tick {}: {} {:?}", prefix, step.tick, step.agent, step.action);
        }
    }

    println!();
}
