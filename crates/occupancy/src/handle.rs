//! VehicleAuthority / VehicleHandle - a vehicle's authority worker and the
//! cloneable requester-side handle that talks to it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{
    AgentId, ContractError, InteractionResponse, Participant, RequestId, SeatLayout, VehicleId,
    VehicleLink, VehicleSnapshot,
};

use crate::error::OccupancyError;
use crate::metrics::VehicleMetrics;
use crate::protocol::{plan_interaction, InteractionPlan, Reply, VehicleCommand};
use crate::state::OccupancyMutation;
use crate::worker::{self, VehicleWorker};

/// Fault injection for the holder side.
///
/// Stalled requests are parked and never answered unless a hand-over
/// resolves them; dropped removals are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultConfig {
    pub stall_authority_requests: bool,
    pub stall_boarding_requests: bool,
    pub drop_passenger_removals: bool,
}

/// Owner of a running vehicle worker
pub struct VehicleAuthority {
    handle: VehicleHandle,
    worker_handle: JoinHandle<()>,
}

impl VehicleAuthority {
    /// Spawn the worker task for `vehicle` with the default host id
    pub fn spawn(
        vehicle: VehicleId,
        seats: SeatLayout,
        queue_capacity: usize,
        faults: FaultConfig,
    ) -> Self {
        Self::spawn_hosted(vehicle, AgentId::new("host"), seats, queue_capacity, faults)
    }

    /// Spawn the worker task for `vehicle`; `host` names the session host
    /// while the vehicle is unclaimed
    pub fn spawn_hosted(
        vehicle: VehicleId,
        host: AgentId,
        seats: SeatLayout,
        queue_capacity: usize,
        faults: FaultConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(VehicleSnapshot::new(vehicle.clone()));
        let metrics = Arc::new(VehicleMetrics::new());

        let worker = VehicleWorker::new(
            vehicle.clone(),
            host,
            faults,
            Arc::clone(&metrics),
            snapshot_tx,
        );
        let worker_handle = tokio::spawn(worker::run(worker, rx));

        Self {
            handle: VehicleHandle {
                vehicle,
                seats,
                tx,
                snapshot_rx,
                metrics,
            },
            worker_handle,
        }
    }

    /// Get a requester-side handle
    pub fn handle(&self) -> VehicleHandle {
        self.handle.clone()
    }

    pub fn vehicle_id(&self) -> &VehicleId {
        &self.handle.vehicle
    }

    pub fn metrics(&self) -> &Arc<VehicleMetrics> {
        &self.handle.metrics
    }

    /// Stop the worker; parked requests are dropped unanswered
    #[instrument(name = "vehicle_authority_shutdown", skip(self), fields(vehicle = %self.handle.vehicle))]
    pub async fn shutdown(self) {
        if self.handle.tx.send(VehicleCommand::Shutdown).await.is_err() {
            debug!(vehicle = %self.handle.vehicle, "Worker already stopped");
        }
        if let Err(e) = self.worker_handle.await {
            error!(vehicle = %self.handle.vehicle, error = ?e, "Worker task panicked");
        }
        debug!(vehicle = %self.handle.vehicle, "VehicleAuthority shutdown complete");
    }
}

/// Cloneable handle used by agents and the simulation loop
#[derive(Clone)]
pub struct VehicleHandle {
    vehicle: VehicleId,
    seats: SeatLayout,
    tx: mpsc::Sender<VehicleCommand>,
    snapshot_rx: watch::Receiver<VehicleSnapshot>,
    metrics: Arc<VehicleMetrics>,
}

impl std::fmt::Debug for VehicleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleHandle")
            .field("vehicle", &self.vehicle)
            .finish_non_exhaustive()
    }
}

impl VehicleHandle {
    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<VehicleSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn metrics(&self) -> &Arc<VehicleMetrics> {
        &self.metrics
    }

    /// Move authority without a request (ownership change by the substrate)
    pub async fn hand_over(&self, to: Participant) -> Result<(), OccupancyError> {
        self.send(VehicleCommand::HandOver { to }).await
    }

    /// Tell the vehicle that `agent` was destroyed or disconnected
    pub async fn agent_left(&self, agent: AgentId) -> Result<(), OccupancyError> {
        self.send(VehicleCommand::AgentLeft { agent }).await
    }

    async fn send(&self, command: VehicleCommand) -> Result<(), OccupancyError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| OccupancyError::worker_closed(self.vehicle.as_str()))
    }

    /// Deliver a command and wait for its single reply
    async fn round_trip(
        &self,
        command: impl FnOnce(Reply) -> VehicleCommand,
    ) -> Result<InteractionResponse, ContractError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| ContractError::vehicle_unavailable(self.vehicle.as_str()))?;
        rx.await
            .map_err(|_| ContractError::vehicle_unavailable(self.vehicle.as_str()))
    }

    fn resolve_locally(&self, response: InteractionResponse) -> InteractionResponse {
        self.metrics.record_response(response);
        observability::record_interaction(&self.vehicle, response);
        response
    }
}

impl VehicleLink for VehicleHandle {
    fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle
    }

    fn snapshot(&self) -> VehicleSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    fn seats(&self) -> &SeatLayout {
        &self.seats
    }

    #[instrument(
        name = "vehicle_request_interaction",
        skip_all,
        fields(vehicle = %self.vehicle, request = %request)
    )]
    async fn request_interaction(
        &self,
        request: RequestId,
    ) -> Result<InteractionResponse, ContractError> {
        let snapshot = self.snapshot();
        let plan = plan_interaction(&snapshot, &request.requester);
        debug!(plan = ?plan, revision = snapshot.revision, "Interaction planned");

        match plan {
            InteractionPlan::RefuseFull => Ok(self.resolve_locally(InteractionResponse::Refused)),
            InteractionPlan::CommitDriver => {
                self.round_trip(|reply| VehicleCommand::Commit {
                    request,
                    mutation: OccupancyMutation::ConfirmDriver,
                    reply,
                })
                .await
            }
            InteractionPlan::CommitPassenger => {
                self.round_trip(|reply| VehicleCommand::Commit {
                    request,
                    mutation: OccupancyMutation::ConfirmPassenger,
                    reply,
                })
                .await
            }
            InteractionPlan::RequestAuthority => {
                self.round_trip(|reply| VehicleCommand::RequestAuthority { request, reply })
                    .await
            }
            InteractionPlan::RequestBoarding => {
                self.round_trip(|reply| VehicleCommand::RequestBoarding { request, reply })
                    .await
            }
        }
    }

    #[instrument(
        name = "vehicle_remove_driver",
        skip_all,
        fields(vehicle = %self.vehicle, request = %request)
    )]
    async fn remove_driver(&self, request: RequestId) -> Result<InteractionResponse, ContractError> {
        self.round_trip(|reply| VehicleCommand::Commit {
            request,
            mutation: OccupancyMutation::RemoveDriver,
            reply,
        })
        .await
    }

    /// Optimistic: `Exit` is returned before the holder has applied the change.
    #[instrument(
        name = "vehicle_remove_passenger",
        skip_all,
        fields(vehicle = %self.vehicle, request = %request)
    )]
    async fn remove_passenger(
        &self,
        request: RequestId,
    ) -> Result<InteractionResponse, ContractError> {
        let command = VehicleCommand::RemovePassenger {
            request: request.clone(),
        };
        if self.tx.send(command).await.is_err() {
            warn!(request = %request, "Vehicle worker closed, passenger removal not delivered");
        }
        Ok(self.resolve_locally(InteractionResponse::Exit))
    }

    async fn abandon_request(&self, request: RequestId) -> Result<(), ContractError> {
        self.tx
            .send(VehicleCommand::Abandon { request })
            .await
            .map_err(|_| ContractError::vehicle_unavailable(self.vehicle.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AuthorityState;
    use std::time::Duration;

    fn spawn(faults: FaultConfig) -> VehicleAuthority {
        VehicleAuthority::spawn("buggy".into(), SeatLayout::default(), 16, faults)
    }

    fn request(agent: &str, seq: u64) -> RequestId {
        RequestId::new(agent.into(), seq)
    }

    #[tokio::test]
    async fn test_drive_board_refuse_exit() {
        let authority = spawn(FaultConfig::default());
        let link = authority.handle();

        assert_eq!(
            link.request_interaction(request("alice", 1)).await.unwrap(),
            InteractionResponse::Drive
        );
        assert_eq!(
            link.request_interaction(request("bob", 1)).await.unwrap(),
            InteractionResponse::Passenger
        );
        assert_eq!(
            link.request_interaction(request("carol", 1)).await.unwrap(),
            InteractionResponse::Refused
        );
        assert_eq!(
            link.remove_driver(request("alice", 2)).await.unwrap(),
            InteractionResponse::Exit
        );

        let snap = link.snapshot();
        assert_eq!(snap.authority, AuthorityState::Unclaimed);
        assert!(!snap.flags.has_driver);
        assert!(snap.flags.has_passenger);

        let metrics = authority.metrics().snapshot();
        assert_eq!(metrics.drive_grants, 1);
        assert_eq!(metrics.passenger_admissions, 1);
        assert_eq!(metrics.refusals, 1);
        assert_eq!(metrics.exits, 1);

        authority.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_requests_single_driver() {
        let authority = spawn(FaultConfig::default());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let link = authority.handle();
            tasks.spawn(async move {
                link.request_interaction(request(&format!("agent-{i}"), 1))
                    .await
                    .unwrap()
            });
        }

        let mut drivers = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() == InteractionResponse::Drive {
                drivers += 1;
            }
        }
        assert_eq!(drivers, 1);
        assert!(authority.handle().snapshot().flags.has_driver);

        authority.shutdown().await;
    }

    #[tokio::test]
    async fn test_passenger_exit_is_optimistic() {
        let authority = spawn(FaultConfig {
            drop_passenger_removals: true,
            ..FaultConfig::default()
        });
        let link = authority.handle();
        link.request_interaction(request("alice", 1)).await.unwrap();
        link.request_interaction(request("bob", 1)).await.unwrap();

        assert_eq!(
            link.remove_passenger(request("bob", 2)).await.unwrap(),
            InteractionResponse::Exit
        );

        // The dropped removal leaves the seat marked occupied
        let mut rx = link.subscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.borrow_and_update().flags.has_passenger);
        assert_eq!(
            link.request_interaction(request("carol", 1)).await.unwrap(),
            InteractionResponse::Refused
        );

        authority.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_requests() {
        let authority = spawn(FaultConfig {
            stall_authority_requests: true,
            ..FaultConfig::default()
        });
        let link = authority.handle();

        let pending = tokio::spawn({
            let link = link.clone();
            async move { link.request_interaction(request("alice", 1)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        authority.shutdown().await;

        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(ContractError::VehicleUnavailable { .. })
        ));
        assert!(matches!(
            link.hand_over(Participant::Host).await,
            Err(OccupancyError::WorkerClosed { .. })
        ));
    }
}
