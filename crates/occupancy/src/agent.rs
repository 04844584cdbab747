//! AgentController - the requester side of vehicle interaction.
//!
//! Tracks what the agent is doing, which vehicle its forward probe found,
//! and where it sits. Every interact intent becomes exactly one request
//! whose response drives the local state change.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use contracts::{
    AgentId, Highlight, Highlighter, InteractionResponse, Pose, RequestId, RidingState, Seat,
    VehicleId, VehicleLink,
};

use crate::error::OccupancyError;

/// Exit position in the vehicle's local space: 3 m left, 1 m up
pub const DISMOUNT_OFFSET: [f32; 3] = [-3.0, 1.0, 0.0];

/// Where the agent is relative to the last vehicle it used
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Free,
    /// Attached to a seat anchor, following the vehicle
    Seated {
        vehicle: VehicleId,
        seat: Seat,
        anchor: Pose,
    },
    /// Just exited; `offset` is in the vehicle's local space
    Dismounted { vehicle: VehicleId, offset: [f32; 3] },
}

/// Per-agent riding state machine
pub struct AgentController<L> {
    id: AgentId,
    state: RidingState,
    target: Option<L>,
    placement: Placement,
    request_timeout: Option<Duration>,
    highlighter: Arc<dyn Highlighter>,
    next_seq: u64,
}

impl<L: VehicleLink + Clone> AgentController<L> {
    pub fn new(id: AgentId, highlighter: Arc<dyn Highlighter>) -> Self {
        Self {
            id,
            state: RidingState::Walking,
            target: None,
            placement: Placement::Free,
            request_timeout: None,
            highlighter,
            next_seq: 0,
        }
    }

    /// Abandon requests locally after `timeout`; `None` waits forever
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn state(&self) -> RidingState {
        self.state
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn target(&self) -> Option<&L> {
        self.target.as_ref()
    }

    /// Vehicle under control, for throttle, steering and reset input
    pub fn driven_vehicle(&self) -> Result<&VehicleId, OccupancyError> {
        match (&self.state, &self.placement) {
            (RidingState::Driving, Placement::Seated { vehicle, .. }) => Ok(vehicle),
            _ => Err(OccupancyError::not_riding(self.id.as_str())),
        }
    }

    /// Forward probe found `link`'s vehicle
    pub fn focus(&mut self, link: L) {
        if self.state != RidingState::Walking {
            debug!(agent = %self.id, "Focus ignored while riding");
            return;
        }
        if let Some(previous) = self.target.take() {
            if previous.vehicle_id() != link.vehicle_id() {
                self.highlighter.highlight(previous.vehicle_id(), Highlight::None);
            }
        }

        let flags = link.snapshot().flags;
        let highlight = if flags.is_full() {
            Highlight::Unavailable
        } else {
            Highlight::Available
        };
        self.highlighter.highlight(link.vehicle_id(), highlight);
        debug!(agent = %self.id, vehicle = %link.vehicle_id(), ?highlight, "Vehicle in focus");
        self.target = Some(link);
    }

    /// Forward probe lost its target
    pub fn unfocus(&mut self) {
        if self.state != RidingState::Walking {
            return;
        }
        self.detach();
    }

    /// Act on an interact intent.
    ///
    /// Walking agents request a seat, drivers and passengers leave. A timed
    /// out seat request is withdrawn from the vehicle; anything it was
    /// granted in the meantime is handed back.
    #[instrument(name = "agent_interact", skip(self), fields(agent = %self.id, state = ?self.state))]
    pub async fn interact(&mut self) -> Result<InteractionResponse, OccupancyError> {
        let link = self
            .target
            .clone()
            .ok_or_else(|| OccupancyError::no_target(self.id.as_str()))?;
        let request = self.next_request();
        let state = self.state;

        let pending = async {
            match state {
                RidingState::Walking => link.request_interaction(request.clone()).await,
                RidingState::Driving => link.remove_driver(request.clone()).await,
                RidingState::Passenger => link.remove_passenger(request.clone()).await,
            }
        };

        let response = match self.request_timeout {
            None => pending.await?,
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result?,
                Err(_) => {
                    let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    warn!(request = %request, timeout_ms, "No response, request abandoned");
                    observability::record_request_timeout(link.vehicle_id());
                    if self.state == RidingState::Walking {
                        if let Err(e) = link.abandon_request(request.clone()).await {
                            warn!(request = %request, error = %e, "Abandon not delivered");
                        }
                        self.detach();
                    }
                    return Err(OccupancyError::RequestTimedOut {
                        vehicle: link.vehicle_id().to_string(),
                        request: request.to_string(),
                        timeout_ms,
                    });
                }
            },
        };

        self.apply_response(&link, response);
        Ok(response)
    }

    fn apply_response(&mut self, link: &L, response: InteractionResponse) {
        let vehicle = link.vehicle_id().clone();
        match response {
            InteractionResponse::Drive => {
                self.seat(link, Seat::Driver);
                self.state = RidingState::Driving;
                info!(agent = %self.id, vehicle = %vehicle, "Now driving");
            }
            InteractionResponse::Passenger => {
                self.seat(link, Seat::Passenger);
                self.state = RidingState::Passenger;
                info!(agent = %self.id, vehicle = %vehicle, "Now riding as passenger");
            }
            InteractionResponse::Exit => {
                self.state = RidingState::Walking;
                self.target = None;
                info!(agent = %self.id, vehicle = %vehicle, "Exited vehicle");
                self.placement = Placement::Dismounted {
                    vehicle,
                    offset: DISMOUNT_OFFSET,
                };
            }
            InteractionResponse::Refused => {
                debug!(agent = %self.id, vehicle = %vehicle, "Interaction refused");
            }
        }
    }

    fn seat(&mut self, link: &L, seat: Seat) {
        let seats = link.seats();
        let anchor = match seat {
            Seat::Driver => seats.driver,
            Seat::Passenger => seats.passenger,
        };
        self.highlighter.highlight(link.vehicle_id(), Highlight::None);
        self.placement = Placement::Seated {
            vehicle: link.vehicle_id().clone(),
            seat,
            anchor,
        };
    }

    fn detach(&mut self) {
        if let Some(link) = self.target.take() {
            self.highlighter.highlight(link.vehicle_id(), Highlight::None);
            debug!(agent = %self.id, vehicle = %link.vehicle_id(), "Focus lost");
        }
    }

    fn next_request(&mut self) -> RequestId {
        self.next_seq += 1;
        RequestId::new(self.id.clone(), self.next_seq)
    }
}
