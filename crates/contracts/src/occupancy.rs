//! Occupancy and authority contracts
//!
//! The replicated view of a vehicle that every participant observes, and the
//! transient interaction vocabulary exchanged between agents and vehicles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AgentId, VehicleId};

/// Replicated ridership flags of a vehicle.
///
/// Written only by the participant holding authority over the vehicle,
/// read by everyone else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyFlags {
    pub has_driver: bool,
    pub has_passenger: bool,
}

impl OccupancyFlags {
    /// Both seats taken
    pub fn is_full(&self) -> bool {
        self.has_driver && self.has_passenger
    }
}

/// Who may currently mutate a vehicle's occupancy.
///
/// `Unclaimed` means the session host acts as the implicit holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityState {
    #[default]
    Unclaimed,
    HeldBy(AgentId),
}

impl AuthorityState {
    /// The participant that evaluates requests in this state
    pub fn holder(&self) -> Participant {
        match self {
            AuthorityState::Unclaimed => Participant::Host,
            AuthorityState::HeldBy(agent) => Participant::Agent(agent.clone()),
        }
    }

    /// Whether `agent` is the current holder
    pub fn is_held_by(&self, agent: &AgentId) -> bool {
        matches!(self, AuthorityState::HeldBy(holder) if holder == agent)
    }
}

/// A participant able to hold authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Participant {
    /// The session's default authority owner
    Host,
    Agent(AgentId),
}

impl Participant {
    /// Agent acting for this participant, with `host` standing in for `Host`
    pub fn resolve<'a>(&'a self, host: &'a AgentId) -> &'a AgentId {
        match self {
            Participant::Host => host,
            Participant::Agent(agent) => agent,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Host => write!(f, "<host>"),
            Participant::Agent(id) => write!(f, "{id}"),
        }
    }
}

impl From<AgentId> for Participant {
    fn from(agent: AgentId) -> Self {
        Participant::Agent(agent)
    }
}

/// Everything an observer knows about a vehicle at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleSnapshot {
    pub vehicle: VehicleId,
    pub flags: OccupancyFlags,
    pub authority: AuthorityState,
    /// Bumped on every committed occupancy or authority change
    pub revision: u64,
}

impl VehicleSnapshot {
    pub fn new(vehicle: VehicleId) -> Self {
        Self {
            vehicle,
            flags: OccupancyFlags::default(),
            authority: AuthorityState::Unclaimed,
            revision: 0,
        }
    }
}

/// Outcome delivered to the requester of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionResponse {
    Drive,
    Passenger,
    Exit,
    Refused,
}

impl InteractionResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionResponse::Drive => "drive",
            InteractionResponse::Passenger => "passenger",
            InteractionResponse::Exit => "exit",
            InteractionResponse::Refused => "refused",
        }
    }
}

impl fmt::Display for InteractionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidingState {
    #[default]
    Walking,
    Driving,
    Passenger,
}

/// A seat anchor on a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    Driver,
    Passenger,
}

/// Outline state requested from the highlight collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Available,
    Unavailable,
    None,
}

/// Outline/highlight collaborator.
///
/// Rendering lives outside this workspace; implementations only receive the
/// requested state.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, vehicle: &VehicleId, highlight: Highlight);
}
