//! # Occupancy
//!
//! Vehicle occupancy, authority negotiation and the agent riding state
//! machine.
//!
//! Each vehicle runs one authority worker task. The worker is the only
//! writer of the vehicle's [`OccupancyState`] and serializes every request
//! against the live flags, so at most one agent is ever granted the driver
//! seat and at most one the passenger seat. Observers read replicated
//! [`contracts::VehicleSnapshot`]s through a `watch` channel.
//!
//! ## Usage
//! ```ignore
//! let authority = VehicleAuthority::spawn("buggy".into(), seats, 64, FaultConfig::default());
//! let mut alice = AgentController::new("alice".into(), highlighter);
//! alice.focus(authority.handle());
//! let response = alice.interact().await?;
//! ```

mod agent;
mod authority;
mod error;
mod handle;
mod metrics;
mod protocol;
mod state;
mod worker;

pub use agent::{AgentController, Placement, DISMOUNT_OFFSET};
pub use authority::{AuthorityDecision, AuthorityNegotiator, GrantKind};
pub use error::OccupancyError;
pub use handle::{FaultConfig, VehicleAuthority, VehicleHandle};
pub use metrics::{VehicleMetrics, VehicleMetricsSnapshot};
pub use protocol::{can_board, plan_interaction, InteractionPlan};
pub use state::{OccupancyMutation, OccupancyState};
