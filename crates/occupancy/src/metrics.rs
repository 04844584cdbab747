//! Per-vehicle authority worker metrics

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::InteractionResponse;

/// Counters shared between a vehicle handle and its worker
#[derive(Debug, Default)]
pub struct VehicleMetrics {
    /// Commands received by the worker
    commands: AtomicU64,
    drive_grants: AtomicU64,
    passenger_admissions: AtomicU64,
    exits: AtomicU64,
    refusals: AtomicU64,
    /// Authority moved between participants
    authority_transfers: AtomicU64,
    /// Driver flag reset by unsolicited grants
    driver_resets: AtomicU64,
    /// Commands discarded by fault injection
    dropped_commands: AtomicU64,
    /// Commits refused because the caller was not the holder
    stale_commits: AtomicU64,
    /// Replies nobody was waiting for
    suppressed_responses: AtomicU64,
}

impl VehicleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    pub fn inc_commands(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a delivered response under its kind
    pub fn record_response(&self, response: InteractionResponse) {
        let counter = match response {
            InteractionResponse::Drive => &self.drive_grants,
            InteractionResponse::Passenger => &self.passenger_admissions,
            InteractionResponse::Exit => &self.exits,
            InteractionResponse::Refused => &self.refusals,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn authority_transfers(&self) -> u64 {
        self.authority_transfers.load(Ordering::Relaxed)
    }

    pub fn inc_authority_transfers(&self) {
        self.authority_transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn driver_resets(&self) -> u64 {
        self.driver_resets.load(Ordering::Relaxed)
    }

    pub fn inc_driver_resets(&self) {
        self.driver_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_commands(&self) -> u64 {
        self.dropped_commands.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_commands(&self) {
        self.dropped_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_commits(&self) -> u64 {
        self.stale_commits.load(Ordering::Relaxed)
    }

    pub fn inc_stale_commits(&self) {
        self.stale_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn suppressed_responses(&self) -> u64 {
        self.suppressed_responses.load(Ordering::Relaxed)
    }

    pub fn inc_suppressed_responses(&self) {
        self.suppressed_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> VehicleMetricsSnapshot {
        VehicleMetricsSnapshot {
            commands: self.commands(),
            drive_grants: self.drive_grants.load(Ordering::Relaxed),
            passenger_admissions: self.passenger_admissions.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            refusals: self.refusals.load(Ordering::Relaxed),
            authority_transfers: self.authority_transfers(),
            driver_resets: self.driver_resets(),
            dropped_commands: self.dropped_commands(),
            stale_commits: self.stale_commits(),
            suppressed_responses: self.suppressed_responses(),
        }
    }
}

/// Snapshot of vehicle metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VehicleMetricsSnapshot {
    pub commands: u64,
    pub drive_grants: u64,
    pub passenger_admissions: u64,
    pub exits: u64,
    pub refusals: u64,
    pub authority_transfers: u64,
    pub driver_resets: u64,
    pub dropped_commands: u64,
    pub stale_commits: u64,
    pub suppressed_responses: u64,
}
