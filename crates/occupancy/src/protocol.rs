//! Interaction protocol - requester-side planning and worker commands.
//!
//! The requester plans against its replicated snapshot; the holder
//! re-evaluates against the live flags before anything is committed.

use tokio::sync::oneshot;

use contracts::{AgentId, InteractionResponse, OccupancyFlags, Participant, RequestId, VehicleSnapshot};

use crate::state::OccupancyMutation;

/// What a walking agent should do with the vehicle in focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPlan {
    /// Requester already holds authority and the driver seat is free
    CommitDriver,
    /// Driver seat free, authority elsewhere
    RequestAuthority,
    /// Requester holds authority and only the passenger seat is free
    CommitPassenger,
    /// Passenger seat free, ask the holder
    RequestBoarding,
    /// Both seats taken; resolves locally without a round trip
    RefuseFull,
}

/// Decide the interaction path from the requester's view of the vehicle.
pub fn plan_interaction(snapshot: &VehicleSnapshot, requester: &AgentId) -> InteractionPlan {
    let holds_authority = snapshot.authority.is_held_by(requester);
    let flags = snapshot.flags;

    if !flags.has_driver {
        if holds_authority {
            InteractionPlan::CommitDriver
        } else {
            InteractionPlan::RequestAuthority
        }
    } else if !flags.has_passenger {
        if holds_authority {
            InteractionPlan::CommitPassenger
        } else {
            InteractionPlan::RequestBoarding
        }
    } else {
        InteractionPlan::RefuseFull
    }
}

/// Holder's boarding rule
pub fn can_board(flags: OccupancyFlags) -> bool {
    !flags.has_passenger
}

/// Whether `mutation` still makes sense against the live flags
pub(crate) fn still_admissible(flags: OccupancyFlags, mutation: OccupancyMutation) -> bool {
    match mutation {
        OccupancyMutation::ConfirmDriver => !flags.has_driver,
        OccupancyMutation::ConfirmPassenger => !flags.has_passenger,
        OccupancyMutation::RemoveDriver => flags.has_driver,
        OccupancyMutation::RemovePassenger | OccupancyMutation::ResetDriver => true,
    }
}

pub(crate) type Reply = oneshot::Sender<InteractionResponse>;

/// Messages processed by a vehicle's authority worker
#[derive(Debug)]
pub(crate) enum VehicleCommand {
    /// Ask the holder to hand over authority
    RequestAuthority { request: RequestId, reply: Reply },
    /// Ask the holder to seat the requester as passenger
    RequestBoarding { request: RequestId, reply: Reply },
    /// Direct mutation by a requester that believes it holds authority
    Commit {
        request: RequestId,
        mutation: OccupancyMutation,
        reply: Reply,
    },
    /// Passenger left; no acknowledgment
    RemovePassenger { request: RequestId },
    /// Requester stopped waiting for `request`
    Abandon { request: RequestId },
    /// Substrate moved authority without a request
    HandOver { to: Participant },
    /// Agent destroyed or disconnected
    AgentLeft { agent: AgentId },
    Shutdown,
}

impl VehicleCommand {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            VehicleCommand::RequestAuthority { .. } => "authority_request",
            VehicleCommand::RequestBoarding { .. } => "boarding_request",
            VehicleCommand::Commit { .. } => "commit",
            VehicleCommand::RemovePassenger { .. } => "passenger_removal",
            VehicleCommand::Abandon { .. } => "abandon",
            VehicleCommand::HandOver { .. } => "hand_over",
            VehicleCommand::AgentLeft { .. } => "agent_left",
            VehicleCommand::Shutdown => "shutdown",
        }
    }
}
