//! Layered error definitions
//!
//! Categorized by source: config / authority / vehicle / session

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Authority Errors =====
    /// A participant tried to mutate occupancy without holding authority
    #[error("'{caller}' cannot mutate vehicle '{vehicle}': authority is held by '{holder}'")]
    NotAuthority {
        vehicle: String,
        caller: String,
        holder: String,
    },

    // ===== Vehicle Errors =====
    /// The vehicle's authority worker is gone
    #[error("vehicle '{vehicle}' is unavailable")]
    VehicleUnavailable { vehicle: String },

    /// Wheel set does not describe a four-wheel vehicle
    #[error("invalid wheel layout: {message}")]
    InvalidWheelLayout { message: String },

    // ===== Session Errors =====
    /// Unknown vehicle id
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),

    /// Unknown agent id
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create authority violation error
    pub fn not_authority(
        vehicle: impl Into<String>,
        caller: impl Into<String>,
        holder: impl Into<String>,
    ) -> Self {
        Self::NotAuthority {
            vehicle: vehicle.into(),
            caller: caller.into(),
            holder: holder.into(),
        }
    }

    /// Create vehicle unavailable error
    pub fn vehicle_unavailable(vehicle: impl Into<String>) -> Self {
        Self::VehicleUnavailable {
            vehicle: vehicle.into(),
        }
    }

    /// Create wheel layout error
    pub fn invalid_wheel_layout(message: impl Into<String>) -> Self {
        Self::InvalidWheelLayout {
            message: message.into(),
        }
    }
}
