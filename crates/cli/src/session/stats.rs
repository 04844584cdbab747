//! Session statistics.

use std::time::Duration;

use contracts::{OccupancyFlags, VehicleId};
use observability::SessionMetricsAggregator;
use occupancy::VehicleMetricsSnapshot;

/// Final state of one vehicle
#[derive(Debug, Clone)]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub flags: OccupancyFlags,
    pub position: [f32; 3],
    pub metrics: VehicleMetricsSnapshot,
}

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Physics ticks simulated
    pub ticks: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Agents taking part
    pub agents: usize,

    /// Aggregated interaction and dynamics metrics
    pub metrics: SessionMetricsAggregator,

    pub vehicles: Vec<VehicleSummary>,
}

impl SessionStats {
    /// Simulated ticks per wall-clock second
    pub fn ticks_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Ticks/s: {:.2}", self.ticks_per_second());
        println!("   └─ Agents: {}", self.agents);

        println!("\n📈 Session Metrics");
        for line in self.metrics.summary().to_string().lines() {
            println!("   {}", line);
        }

        if !self.vehicles.is_empty() {
            println!("\n🚗 Vehicles");
            for (i, vehicle) in self.vehicles.iter().enumerate() {
                let prefix = if i == self.vehicles.len() - 1 { "└─" } else { "├─" };
                let [x, y, z] = vehicle.position;
                println!(
                    "   {} {}: driver={} passenger={} at ({:.2}, {:.2}, {:.2}), {} transfers, {} resets, {} dropped",
                    prefix,
                    vehicle.id,
                    vehicle.flags.has_driver,
                    vehicle.flags.has_passenger,
                    x,
                    y,
                    z,
                    vehicle.metrics.authority_transfers,
                    vehicle.metrics.driver_resets,
                    vehicle.metrics.dropped_commands,
                );
            }
        }

        println!();
    }
}
