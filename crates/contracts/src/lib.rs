//! # Contracts
//!
//! Frozen interface contracts shared by every coride crate: identifiers,
//! occupancy and authority types, the session blueprint and the
//! vehicle request/response seam.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Frame convention
//! - Forward is -Z, right is +X, up is +Y
//! - Positive yaw turns right

mod blueprint;
mod dynamics_config;
mod error;
mod ids;
mod link;
mod occupancy;

pub use blueprint::*;
pub use dynamics_config::*;
pub use error::*;
pub use ids::{AgentId, RequestId, VehicleId};
pub use link::{LocalVehicleLink, VehicleLink};
pub use occupancy::*;
