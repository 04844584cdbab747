//! AuthorityNegotiator - who may mutate a vehicle's occupancy.
//!
//! States per vehicle are `Unclaimed` (the host is the implicit holder) and
//! `HeldBy(agent)`. Requesters waiting for a grant are tracked so a grant can
//! be classified as solicited or unsolicited.

use std::collections::HashSet;

use contracts::{AgentId, AuthorityState, OccupancyFlags, Participant, VehicleId};

/// Holder's answer to an authority-transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityDecision {
    Accept,
    Reject,
}

/// How the new holder came to hold authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    /// The new holder had an outstanding request
    Solicited,
    /// Authority arrived without a request (fallback, hand-over)
    Unsolicited,
}

/// Per-vehicle authority state machine
#[derive(Debug, Clone)]
pub struct AuthorityNegotiator {
    vehicle: VehicleId,
    state: AuthorityState,
    awaiting: HashSet<AgentId>,
}

impl AuthorityNegotiator {
    pub fn new(vehicle: VehicleId) -> Self {
        Self {
            vehicle,
            state: AuthorityState::Unclaimed,
            awaiting: HashSet::new(),
        }
    }

    pub fn vehicle(&self) -> &VehicleId {
        &self.vehicle
    }

    pub fn state(&self) -> &AuthorityState {
        &self.state
    }

    /// Participant evaluating requests right now
    pub fn holder(&self) -> Participant {
        self.state.holder()
    }

    /// Mark `agent` as awaiting authority.
    ///
    /// Returns false if it already had a request outstanding.
    pub fn begin_request(&mut self, agent: &AgentId) -> bool {
        self.awaiting.insert(agent.clone())
    }

    pub fn is_awaiting(&self, agent: &AgentId) -> bool {
        self.awaiting.contains(agent)
    }

    /// Admission rule of the holder: accept iff the vehicle has no driver.
    pub fn evaluate(&self, flags: OccupancyFlags) -> AuthorityDecision {
        if flags.has_driver {
            AuthorityDecision::Reject
        } else {
            AuthorityDecision::Accept
        }
    }

    /// Move authority to `to` and classify the grant.
    pub fn grant(&mut self, to: Participant) -> GrantKind {
        let kind = match &to {
            Participant::Agent(agent) if self.awaiting.remove(agent) => GrantKind::Solicited,
            _ => GrantKind::Unsolicited,
        };
        self.state = match to {
            Participant::Host => AuthorityState::Unclaimed,
            Participant::Agent(agent) => AuthorityState::HeldBy(agent),
        };
        kind
    }

    /// Rejected request: clear the pending flag
    pub fn reject(&mut self, agent: &AgentId) {
        self.awaiting.remove(agent);
    }

    /// Forget a departed agent.
    ///
    /// Returns true when it held authority, which the caller must then
    /// return to the host.
    pub fn revoke(&mut self, agent: &AgentId) -> bool {
        self.awaiting.remove(agent);
        self.state.is_held_by(agent)
    }
}
