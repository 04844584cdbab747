//! Occupancy error types

use thiserror::Error;

/// Occupancy-specific errors
///
/// Admission refusal is not an error; it is `InteractionResponse::Refused`.
#[derive(Debug, Error)]
pub enum OccupancyError {
    /// The vehicle's authority worker has stopped
    #[error("authority worker for vehicle '{vehicle}' is closed")]
    WorkerClosed { vehicle: String },

    /// Request abandoned locally; the remote side may still process it
    #[error("request {request} to vehicle '{vehicle}' timed out after {timeout_ms} ms")]
    RequestTimedOut {
        vehicle: String,
        request: String,
        timeout_ms: u64,
    },

    /// Vehicle input from an agent that is not driving
    #[error("agent '{agent}' is not driving a vehicle")]
    NotRiding { agent: String },

    /// Interact intent while walking with nothing in focus
    #[error("agent '{agent}' has no vehicle in focus")]
    NoTarget { agent: String },

    /// Contract-level error
    #[error("occupancy error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl OccupancyError {
    pub fn worker_closed(vehicle: impl Into<String>) -> Self {
        Self::WorkerClosed {
            vehicle: vehicle.into(),
        }
    }

    pub fn not_riding(agent: impl Into<String>) -> Self {
        Self::NotRiding {
            agent: agent.into(),
        }
    }

    pub fn no_target(agent: impl Into<String>) -> Self {
        Self::NoTarget {
            agent: agent.into(),
        }
    }
}
