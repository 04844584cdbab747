//! VehicleLink trait - the requester's view of a vehicle
//!
//! Implemented by whatever delivers authority-scoped commands to the current
//! holder of a vehicle. Every request carries a [`RequestId`] and resolves
//! exactly once.

use crate::{ContractError, InteractionResponse, RequestId, SeatLayout, VehicleId, VehicleSnapshot};

/// Request/response seam between an agent and a vehicle.
///
/// Uses `trait_variant` to generate the `Send` variant [`VehicleLink`].
#[trait_variant::make(VehicleLink: Send)]
pub trait LocalVehicleLink {
    /// Vehicle this link talks to
    fn vehicle_id(&self) -> &VehicleId;

    /// Latest replicated snapshot (read-only, eventually consistent)
    fn snapshot(&self) -> VehicleSnapshot;

    /// Seat anchors of the vehicle
    fn seats(&self) -> &SeatLayout;

    /// Ask to drive or ride; resolves to `Drive`, `Passenger` or `Refused`
    async fn request_interaction(
        &self,
        request: RequestId,
    ) -> Result<InteractionResponse, ContractError>;

    /// Current driver leaves; resolves to `Exit` once the seat is released
    async fn remove_driver(&self, request: RequestId)
        -> Result<InteractionResponse, ContractError>;

    /// Passenger leaves without waiting for the holder's acknowledgment
    async fn remove_passenger(
        &self,
        request: RequestId,
    ) -> Result<InteractionResponse, ContractError>;

    /// Requester gave up waiting on `request`; whatever it would have
    /// granted is rolled back
    async fn abandon_request(&self, request: RequestId) -> Result<(), ContractError>;
}
