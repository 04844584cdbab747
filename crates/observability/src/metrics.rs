//! Session metrics collection
//!
//! Thin helpers over the `metrics` macros so every crate records the same
//! metric names and labels, plus an in-memory aggregator for end-of-run
//! summaries.

use std::collections::{BTreeMap, HashMap};

use contracts::{InteractionResponse, VehicleId};
use metrics::{counter, gauge, histogram};

/// Record a resolved interaction request
pub fn record_interaction(vehicle: &VehicleId, response: InteractionResponse) {
    counter!(
        "coride_interactions_total",
        "vehicle" => vehicle.to_string(),
        "response" => response.as_str()
    )
    .increment(1);
}

/// Record an authority transfer attempt or substrate-driven move.
///
/// `outcome` is one of `granted`, `rejected`, `released`, `handed_over`, `revoked`.
pub fn record_authority_transfer(vehicle: &VehicleId, outcome: &'static str) {
    counter!(
        "coride_authority_transfers_total",
        "vehicle" => vehicle.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record an unsolicited grant clearing the driver flag
pub fn record_driver_reset(vehicle: &VehicleId) {
    counter!("coride_driver_resets_total", "vehicle" => vehicle.to_string()).increment(1);
}

/// Record a command the substrate dropped or parked
pub fn record_dropped_command(vehicle: &VehicleId, kind: &'static str) {
    counter!(
        "coride_dropped_commands_total",
        "vehicle" => vehicle.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record a request abandoned locally after its timeout
pub fn record_request_timeout(vehicle: &VehicleId) {
    counter!("coride_request_timeouts_total", "vehicle" => vehicle.to_string()).increment(1);
}

/// Record wheels in ground contact after a physics step
pub fn record_grounded_wheels(vehicle: &VehicleId, count: usize) {
    gauge!("coride_grounded_wheels", "vehicle" => vehicle.to_string()).set(count as f64);
}

/// Record forward speed (m/s) after a physics step
pub fn record_vehicle_speed(vehicle: &VehicleId, speed: f32) {
    histogram!("coride_vehicle_speed", "vehicle" => vehicle.to_string()).record(speed as f64);
}

/// Session metrics aggregator
///
/// Aggregates in memory so a run can print a summary without a scraper.
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    /// Physics ticks simulated
    pub total_ticks: u64,

    /// Resolved interactions by response
    pub response_counts: HashMap<InteractionResponse, u64>,

    /// Requests abandoned after the local timeout
    pub timeouts: u64,

    /// Vehicle steps with no wheel on the ground
    pub airborne_steps: u64,

    /// Per-vehicle forward speed
    pub speed_stats: HashMap<VehicleId, RunningStats>,

    /// Grounded wheel count over all vehicle steps
    pub grounded_stats: RunningStats,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one physics tick
    pub fn record_tick(&mut self) {
        self.total_ticks += 1;
    }

    pub fn record_response(&mut self, response: InteractionResponse) {
        *self.response_counts.entry(response).or_insert(0) += 1;
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    /// Fold in one vehicle step
    pub fn record_vehicle_step(&mut self, vehicle: &VehicleId, speed: f32, grounded_wheels: usize) {
        if grounded_wheels == 0 {
            self.airborne_steps += 1;
        }
        self.grounded_stats.push(grounded_wheels as f64);
        self.speed_stats
            .entry(vehicle.clone())
            .or_default()
            .push(speed as f64);
    }

    /// Build a summary report
    pub fn summary(&self) -> MetricsSummary {
        let total_interactions = self.response_counts.values().sum();
        MetricsSummary {
            total_ticks: self.total_ticks,
            total_interactions,
            responses: self
                .response_counts
                .iter()
                .map(|(response, count)| (response.as_str(), *count))
                .collect(),
            timeouts: self.timeouts,
            airborne_steps: self.airborne_steps,
            grounded_wheels: StatsSummary::from(&self.grounded_stats),
            vehicle_speed: self
                .speed_stats
                .iter()
                .map(|(vehicle, stats)| (vehicle.to_string(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub total_interactions: u64,
    /// Counts by response name, sorted
    pub responses: BTreeMap<&'static str, u64>,
    pub timeouts: u64,
    pub airborne_steps: u64,
    pub grounded_wheels: StatsSummary,
    /// Speed statistics by vehicle id, sorted
    pub vehicle_speed: BTreeMap<String, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Metrics Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(f, "Interactions: {}", self.total_interactions)?;
        for (response, count) in &self.responses {
            writeln!(f, "  {}: {}", response, count)?;
        }
        writeln!(f, "Timed out requests: {}", self.timeouts)?;
        writeln!(f, "Airborne vehicle steps: {}", self.airborne_steps)?;
        writeln!(f, "Grounded wheels: {}", self.grounded_wheels)?;

        if !self.vehicle_speed.is_empty() {
            writeln!(f, "Vehicle speed (m/s):")?;
            for (vehicle, stats) in &self.vehicle_speed {
                writeln!(f, "  {}: {}", vehicle, stats)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
