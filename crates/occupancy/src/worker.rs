//! Vehicle authority worker - the single writer of one vehicle's occupancy.
//!
//! Commands are processed strictly in arrival order, which serializes every
//! request against the live flags. Each change is published on the
//! snapshot channel before the matching reply is sent.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, trace, warn};

use contracts::{AgentId, InteractionResponse, Participant, RequestId, VehicleId, VehicleSnapshot};

use crate::authority::{AuthorityDecision, AuthorityNegotiator, GrantKind};
use crate::handle::FaultConfig;
use crate::metrics::VehicleMetrics;
use crate::protocol::{can_board, still_admissible, Reply, VehicleCommand};
use crate::state::{OccupancyMutation, OccupancyState};

/// Agents behind the occupancy flags
#[derive(Debug, Default)]
struct Occupants {
    driver: Option<AgentId>,
    passenger: Option<AgentId>,
}

impl Occupants {
    fn is_driver(&self, agent: &AgentId) -> bool {
        self.driver.as_ref() == Some(agent)
    }

    fn is_passenger(&self, agent: &AgentId) -> bool {
        self.passenger.as_ref() == Some(agent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParkedKind {
    Authority,
    Boarding,
}

impl ParkedKind {
    fn as_str(&self) -> &'static str {
        match self {
            ParkedKind::Authority => "authority_request",
            ParkedKind::Boarding => "boarding_request",
        }
    }
}

/// Request the holder never answered
#[derive(Debug)]
struct ParkedRequest {
    request: RequestId,
    kind: ParkedKind,
    reply: Reply,
}

pub(crate) struct VehicleWorker {
    vehicle: VehicleId,
    /// Acts for `Participant::Host` while the vehicle is unclaimed
    host: AgentId,
    negotiator: AuthorityNegotiator,
    occupants: Occupants,
    occupancy: OccupancyState,
    revision: u64,
    faults: FaultConfig,
    parked: Vec<ParkedRequest>,
    metrics: Arc<VehicleMetrics>,
    snapshot_tx: watch::Sender<VehicleSnapshot>,
}

impl VehicleWorker {
    pub(crate) fn new(
        vehicle: VehicleId,
        host: AgentId,
        faults: FaultConfig,
        metrics: Arc<VehicleMetrics>,
        snapshot_tx: watch::Sender<VehicleSnapshot>,
    ) -> Self {
        Self {
            negotiator: AuthorityNegotiator::new(vehicle.clone()),
            occupants: Occupants::default(),
            occupancy: OccupancyState::new(vehicle.clone()).with_host(host.clone()),
            vehicle,
            host,
            revision: 0,
            faults,
            parked: Vec::new(),
            metrics,
            snapshot_tx,
        }
    }

    pub(crate) fn handle(&mut self, command: VehicleCommand) {
        self.metrics.inc_commands();
        trace!(vehicle = %self.vehicle, kind = command.kind(), "command received");

        match command {
            VehicleCommand::RequestAuthority { request, reply } => {
                self.on_authority_request(request, reply)
            }
            VehicleCommand::RequestBoarding { request, reply } => {
                self.on_boarding_request(request, reply)
            }
            VehicleCommand::Commit {
                request,
                mutation,
                reply,
            } => self.on_commit(request, mutation, reply),
            VehicleCommand::RemovePassenger { request } => self.on_remove_passenger(request),
            VehicleCommand::Abandon { request } => self.on_abandon(request),
            VehicleCommand::HandOver { to } => self.on_hand_over(to),
            VehicleCommand::AgentLeft { agent } => self.on_agent_left(agent),
            VehicleCommand::Shutdown => {}
        }
    }

    fn on_authority_request(&mut self, request: RequestId, reply: Reply) {
        let requester = request.requester.clone();
        if !self.negotiator.begin_request(&requester) {
            warn!(vehicle = %self.vehicle, request = %request, "Authority request already outstanding");
            self.respond(&request, reply, InteractionResponse::Refused);
            return;
        }

        if self.faults.stall_authority_requests {
            self.park(request, ParkedKind::Authority, reply);
            return;
        }

        match self.negotiator.evaluate(self.occupancy.flags()) {
            AuthorityDecision::Accept => {
                let kind = self.transfer(Participant::Agent(requester), "granted");
                let response = self
                    .complete_grant(kind)
                    .unwrap_or(InteractionResponse::Refused);
                self.respond(&request, reply, response);
            }
            AuthorityDecision::Reject => {
                self.negotiator.reject(&requester);
                observability::record_authority_transfer(&self.vehicle, "rejected");
                debug!(vehicle = %self.vehicle, request = %request, "Authority request rejected, vehicle has a driver");
                self.respond(&request, reply, InteractionResponse::Refused);
            }
        }
    }

    fn on_boarding_request(&mut self, request: RequestId, reply: Reply) {
        if self.faults.stall_boarding_requests {
            self.park(request, ParkedKind::Boarding, reply);
            return;
        }

        let response = if self.occupants.is_driver(&request.requester) {
            debug!(vehicle = %self.vehicle, request = %request, "Boarding refused, requester is the driver");
            InteractionResponse::Refused
        } else if can_board(self.occupancy.flags()) {
            let holder = self.negotiator.holder();
            match self.commit(&holder, OccupancyMutation::ConfirmPassenger) {
                Ok(_) => {
                    info!(
                        vehicle = %self.vehicle,
                        request = %request,
                        holder = %holder.resolve(&self.host),
                        "Passenger admitted"
                    );
                    self.occupants.passenger = Some(request.requester.clone());
                    InteractionResponse::Passenger
                }
                Err(e) => {
                    error!(vehicle = %self.vehicle, error = %e, "Passenger commit failed");
                    InteractionResponse::Refused
                }
            }
        } else {
            debug!(vehicle = %self.vehicle, request = %request, "Boarding refused, passenger seat taken");
            InteractionResponse::Refused
        };
        self.respond(&request, reply, response);
    }

    fn on_commit(&mut self, request: RequestId, mutation: OccupancyMutation, reply: Reply) {
        let requester = request.requester.clone();
        match mutation {
            OccupancyMutation::RemoveDriver if !self.occupants.is_driver(&requester) => {
                // A hand-over or departure already released the seat
                info!(vehicle = %self.vehicle, request = %request, "Driver seat already released");
                self.respond(&request, reply, InteractionResponse::Exit);
                return;
            }
            OccupancyMutation::ConfirmPassenger if self.occupants.is_driver(&requester) => {
                debug!(vehicle = %self.vehicle, request = %request, "Driver cannot take the passenger seat");
                self.respond(&request, reply, InteractionResponse::Refused);
                return;
            }
            _ => {}
        }

        if !still_admissible(self.occupancy.flags(), mutation) {
            debug!(
                vehicle = %self.vehicle,
                request = %request,
                mutation = mutation.as_str(),
                "Commit no longer admissible"
            );
            self.respond(&request, reply, InteractionResponse::Refused);
            return;
        }

        let caller = Participant::Agent(requester.clone());
        let response = match self.commit(&caller, mutation) {
            Ok(_) => match mutation {
                OccupancyMutation::ConfirmDriver => {
                    self.occupants.driver = Some(requester);
                    InteractionResponse::Drive
                }
                OccupancyMutation::ConfirmPassenger => {
                    self.occupants.passenger = Some(requester);
                    InteractionResponse::Passenger
                }
                OccupancyMutation::RemoveDriver => {
                    info!(vehicle = %self.vehicle, request = %request, "Driver left");
                    self.occupants.driver = None;
                    self.release_to_host("released");
                    InteractionResponse::Exit
                }
                OccupancyMutation::RemovePassenger => {
                    self.occupants.passenger = None;
                    InteractionResponse::Exit
                }
                OccupancyMutation::ResetDriver => InteractionResponse::Refused,
            },
            Err(e) => {
                self.metrics.inc_stale_commits();
                warn!(vehicle = %self.vehicle, request = %request, error = %e, "Stale commit refused");
                InteractionResponse::Refused
            }
        };
        self.respond(&request, reply, response);
    }

    fn on_remove_passenger(&mut self, request: RequestId) {
        if self.faults.drop_passenger_removals {
            self.metrics.inc_dropped_commands();
            observability::record_dropped_command(&self.vehicle, "passenger_removal");
            warn!(vehicle = %self.vehicle, request = %request, "Passenger removal dropped");
            return;
        }

        let holder = self.negotiator.holder();
        match self.commit(&holder, OccupancyMutation::RemovePassenger) {
            Ok(changed) => {
                self.occupants.passenger = None;
                info!(vehicle = %self.vehicle, request = %request, changed, "Passenger removed")
            }
            Err(e) => error!(vehicle = %self.vehicle, error = %e, "Passenger removal failed"),
        }
    }

    fn on_hand_over(&mut self, to: Participant) {
        if self.negotiator.holder() == to {
            debug!(vehicle = %self.vehicle, to = %to.resolve(&self.host), "Hand-over to current holder ignored");
            return;
        }

        let kind = self.transfer(to.clone(), "handed_over");
        let response = self.complete_grant(kind);

        if let (Some(response), Participant::Agent(agent)) = (response, &to) {
            match self.take_parked(agent, ParkedKind::Authority) {
                Some(parked) => self.respond(&parked.request, parked.reply, response),
                None => debug!(vehicle = %self.vehicle, agent = %agent, "No parked request to resolve"),
            }
        }
    }

    /// Withdraw a request its sender stopped waiting for.
    ///
    /// A parked request is dropped unanswered. One already answered has its
    /// seat rolled back, since the requester never took it.
    fn on_abandon(&mut self, request: RequestId) {
        let requester = request.requester.clone();
        self.negotiator.reject(&requester);

        let before = self.parked.len();
        self.parked.retain(|parked| parked.request != request);
        if self.parked.len() < before {
            info!(vehicle = %self.vehicle, request = %request, "Abandoned request withdrawn");
            return;
        }

        if self.occupants.is_driver(&requester) {
            let caller = Participant::Agent(requester);
            match self.commit(&caller, OccupancyMutation::RemoveDriver) {
                Ok(_) => {
                    info!(vehicle = %self.vehicle, request = %request, "Unclaimed driver seat released");
                    self.occupants.driver = None;
                    self.release_to_host("abandoned");
                }
                Err(e) => error!(vehicle = %self.vehicle, error = %e, "Driver rollback failed"),
            }
        } else if self.occupants.is_passenger(&requester) {
            let holder = self.negotiator.holder();
            match self.commit(&holder, OccupancyMutation::RemovePassenger) {
                Ok(_) => {
                    info!(vehicle = %self.vehicle, request = %request, "Unclaimed passenger seat released");
                    self.occupants.passenger = None;
                }
                Err(e) => error!(vehicle = %self.vehicle, error = %e, "Passenger rollback failed"),
            }
        } else {
            debug!(vehicle = %self.vehicle, request = %request, "Abandoned request left nothing to undo");
        }
    }

    fn on_agent_left(&mut self, agent: AgentId) {
        let was_holder = self.negotiator.revoke(&agent);

        // Dropping the reply senders resolves nothing; the requester is gone.
        let before = self.parked.len();
        self.parked.retain(|parked| parked.request.requester != agent);
        let dropped = before - self.parked.len();

        info!(vehicle = %self.vehicle, agent = %agent, was_holder, dropped, "Agent left");
        if was_holder {
            self.release_to_host("revoked");
        }
    }

    /// Mutate as `caller`, publishing when the flags changed
    fn commit(
        &mut self,
        caller: &Participant,
        mutation: OccupancyMutation,
    ) -> Result<bool, contracts::ContractError> {
        let holder = self.negotiator.holder();
        let changed = self.occupancy.apply(&holder, caller, mutation)?;
        if changed {
            self.publish();
        }
        Ok(changed)
    }

    /// Move authority to `to` and publish
    fn transfer(&mut self, to: Participant, outcome: &'static str) -> GrantKind {
        let from = self.negotiator.holder();
        let kind = self.negotiator.grant(to.clone());

        self.metrics.inc_authority_transfers();
        observability::record_authority_transfer(&self.vehicle, outcome);
        info!(
            vehicle = %self.vehicle,
            from = %from.resolve(&self.host),
            to = %to.resolve(&self.host),
            outcome,
            "Authority transferred"
        );

        if from != to {
            self.publish();
        }
        kind
    }

    /// New holder's reaction to a grant.
    ///
    /// A solicited grant seats the requester as driver and yields the reply
    /// owed to it. An unsolicited grant only resets the driver flag.
    fn complete_grant(&mut self, kind: GrantKind) -> Option<InteractionResponse> {
        let holder = self.negotiator.holder();
        match kind {
            GrantKind::Solicited => {
                let holder_id = holder.resolve(&self.host).clone();
                if self.occupancy.flags().has_driver {
                    warn!(vehicle = %self.vehicle, holder = %holder_id, "Granted authority but driver seat is taken");
                    return Some(InteractionResponse::Refused);
                }
                match self.commit(&holder, OccupancyMutation::ConfirmDriver) {
                    Ok(_) => {
                        info!(vehicle = %self.vehicle, driver = %holder_id, "Driver committed");
                        self.occupants.driver = Some(holder_id);
                        Some(InteractionResponse::Drive)
                    }
                    Err(e) => {
                        error!(vehicle = %self.vehicle, error = %e, "Driver commit failed");
                        Some(InteractionResponse::Refused)
                    }
                }
            }
            GrantKind::Unsolicited => {
                match self.commit(&holder, OccupancyMutation::ResetDriver) {
                    Ok(changed) => {
                        self.occupants.driver = None;
                        self.metrics.inc_driver_resets();
                        observability::record_driver_reset(&self.vehicle);
                        debug!(
                            vehicle = %self.vehicle,
                            holder = %holder.resolve(&self.host),
                            changed,
                            "Driver flag reset"
                        );
                    }
                    Err(e) => error!(vehicle = %self.vehicle, error = %e, "Driver reset failed"),
                }
                None
            }
        }
    }

    fn release_to_host(&mut self, outcome: &'static str) {
        let kind = self.transfer(Participant::Host, outcome);
        self.complete_grant(kind);
    }

    fn park(&mut self, request: RequestId, kind: ParkedKind, reply: Reply) {
        self.metrics.inc_dropped_commands();
        observability::record_dropped_command(&self.vehicle, kind.as_str());
        warn!(
            vehicle = %self.vehicle,
            request = %request,
            kind = kind.as_str(),
            "Holder not responding, request left pending"
        );
        self.parked.push(ParkedRequest {
            request,
            kind,
            reply,
        });
    }

    fn take_parked(&mut self, agent: &AgentId, kind: ParkedKind) -> Option<ParkedRequest> {
        let index = self
            .parked
            .iter()
            .position(|parked| parked.kind == kind && &parked.request.requester == agent)?;
        Some(self.parked.remove(index))
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.snapshot_tx.send_replace(VehicleSnapshot {
            vehicle: self.vehicle.clone(),
            flags: self.occupancy.flags(),
            authority: self.negotiator.state().clone(),
            revision: self.revision,
        });
    }

    fn respond(&self, request: &RequestId, reply: Reply, response: InteractionResponse) {
        self.metrics.record_response(response);
        observability::record_interaction(&self.vehicle, response);

        if reply.send(response).is_err() {
            self.metrics.inc_suppressed_responses();
            debug!(
                vehicle = %self.vehicle,
                request = %request,
                response = %response,
                "Requester gone, response suppressed"
            );
        }
    }
}

/// Worker task that owns one vehicle's occupancy
#[instrument(name = "vehicle_worker_loop", skip(worker, rx), fields(vehicle = %worker.vehicle))]
pub(crate) async fn run(mut worker: VehicleWorker, mut rx: mpsc::Receiver<VehicleCommand>) {
    debug!(vehicle = %worker.vehicle, "Vehicle worker started");

    while let Some(command) = rx.recv().await {
        if matches!(command, VehicleCommand::Shutdown) {
            break;
        }
        worker.handle(command);
    }

    debug!(
        vehicle = %worker.vehicle,
        parked = worker.parked.len(),
        "Vehicle worker stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AuthorityState, OccupancyFlags};
    use tokio::sync::oneshot;

    struct Fixture {
        worker: VehicleWorker,
        snapshots: watch::Receiver<VehicleSnapshot>,
        metrics: Arc<VehicleMetrics>,
    }

    fn fixture(faults: FaultConfig) -> Fixture {
        let (tx, snapshots) = watch::channel(VehicleSnapshot::new("buggy".into()));
        let metrics = Arc::new(VehicleMetrics::new());
        Fixture {
            worker: VehicleWorker::new(
                "buggy".into(),
                "host".into(),
                faults,
                Arc::clone(&metrics),
                tx,
            ),
            snapshots,
            metrics,
        }
    }

    fn request(agent: &str, seq: u64) -> RequestId {
        RequestId::new(agent.into(), seq)
    }

    /// Send a reply-carrying command and return the receiver
    fn ask(
        worker: &mut VehicleWorker,
        build: impl FnOnce(Reply) -> VehicleCommand,
    ) -> oneshot::Receiver<InteractionResponse> {
        let (reply, rx) = oneshot::channel();
        worker.handle(build(reply));
        rx
    }

    fn request_authority(worker: &mut VehicleWorker, agent: &str) -> oneshot::Receiver<InteractionResponse> {
        ask(worker, |reply| VehicleCommand::RequestAuthority {
            request: request(agent, 1),
            reply,
        })
    }

    #[test]
    fn test_first_requester_drives_second_refused() {
        let mut fx = fixture(FaultConfig::default());

        let mut alice = request_authority(&mut fx.worker, "alice");
        let mut bob = request_authority(&mut fx.worker, "bob");

        assert_eq!(alice.try_recv().unwrap(), InteractionResponse::Drive);
        assert_eq!(bob.try_recv().unwrap(), InteractionResponse::Refused);

        let snap = fx.snapshots.borrow().clone();
        assert!(snap.flags.has_driver);
        assert_eq!(snap.authority, AuthorityState::HeldBy("alice".into()));
        // Grant and driver commit
        assert_eq!(snap.revision, 2);
    }

    #[test]
    fn test_boarding_admits_one_passenger() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");

        let mut bob = ask(&mut fx.worker, |reply| VehicleCommand::RequestBoarding {
            request: request("bob", 1),
            reply,
        });
        let mut carol = ask(&mut fx.worker, |reply| VehicleCommand::RequestBoarding {
            request: request("carol", 1),
            reply,
        });

        assert_eq!(bob.try_recv().unwrap(), InteractionResponse::Passenger);
        assert_eq!(carol.try_recv().unwrap(), InteractionResponse::Refused);
        assert!(fx.snapshots.borrow().flags.is_full());
    }

    #[test]
    fn test_driver_exit_returns_authority_to_host() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");

        let mut exit = ask(&mut fx.worker, |reply| VehicleCommand::Commit {
            request: request("alice", 2),
            mutation: OccupancyMutation::RemoveDriver,
            reply,
        });

        assert_eq!(exit.try_recv().unwrap(), InteractionResponse::Exit);
        let snap = fx.snapshots.borrow().clone();
        assert_eq!(snap.authority, AuthorityState::Unclaimed);
        assert!(!snap.flags.has_driver);
        assert_eq!(fx.metrics.driver_resets(), 1);
    }

    #[test]
    fn test_commit_by_non_holder_refused() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");

        let mut stale = ask(&mut fx.worker, |reply| VehicleCommand::Commit {
            request: request("bob", 1),
            mutation: OccupancyMutation::ConfirmPassenger,
            reply,
        });

        assert_eq!(stale.try_recv().unwrap(), InteractionResponse::Refused);
        assert!(!fx.snapshots.borrow().flags.has_passenger);
        assert_eq!(fx.metrics.stale_commits(), 1);
    }

    #[test]
    fn test_unsolicited_hand_over_resets_driver() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");
        assert!(fx.snapshots.borrow().flags.has_driver);

        fx.worker.handle(VehicleCommand::HandOver {
            to: Participant::Agent("bob".into()),
        });

        let snap = fx.snapshots.borrow().clone();
        assert_eq!(snap.authority, AuthorityState::HeldBy("bob".into()));
        assert!(!snap.flags.has_driver);
        assert_eq!(fx.metrics.driver_resets(), 1);

        // Already false: still reset, still counted once per grant
        fx.worker.handle(VehicleCommand::HandOver {
            to: Participant::Agent("carol".into()),
        });
        assert_eq!(fx.metrics.driver_resets(), 2);
    }

    #[test]
    fn test_stalled_request_resolved_by_hand_over() {
        let mut fx = fixture(FaultConfig {
            stall_authority_requests: true,
            ..FaultConfig::default()
        });

        let mut alice = request_authority(&mut fx.worker, "alice");
        assert!(alice.try_recv().is_err());
        assert_eq!(fx.metrics.dropped_commands(), 1);

        fx.worker.handle(VehicleCommand::HandOver {
            to: Participant::Agent("alice".into()),
        });

        assert_eq!(alice.try_recv().unwrap(), InteractionResponse::Drive);
        assert_eq!(fx.metrics.driver_resets(), 0);
        assert!(fx.snapshots.borrow().flags.has_driver);
    }

    #[test]
    fn test_displaced_driver_exit_leaves_flags_alone() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");
        fx.worker.handle(VehicleCommand::HandOver {
            to: Participant::Agent("bob".into()),
        });
        let before = fx.snapshots.borrow().clone();

        let mut exit = ask(&mut fx.worker, |reply| VehicleCommand::Commit {
            request: request("alice", 2),
            mutation: OccupancyMutation::RemoveDriver,
            reply,
        });

        assert_eq!(exit.try_recv().unwrap(), InteractionResponse::Exit);
        assert_eq!(*fx.snapshots.borrow(), before);
        assert_eq!(fx.metrics.stale_commits(), 0);
    }

    #[test]
    fn test_withdrawn_request_makes_later_grant_unsolicited() {
        let mut fx = fixture(FaultConfig {
            stall_authority_requests: true,
            ..FaultConfig::default()
        });

        let mut alice = request_authority(&mut fx.worker, "alice");
        fx.worker.handle(VehicleCommand::Abandon {
            request: request("alice", 1),
        });
        assert!(matches!(
            alice.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));

        fx.worker.handle(VehicleCommand::HandOver {
            to: Participant::Agent("alice".into()),
        });
        let snap = fx.snapshots.borrow().clone();
        assert_eq!(snap.authority, AuthorityState::HeldBy("alice".into()));
        assert!(!snap.flags.has_driver);
        assert_eq!(fx.metrics.driver_resets(), 1);
    }

    #[test]
    fn test_abandon_after_grant_releases_seat() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");
        assert!(fx.snapshots.borrow().flags.has_driver);

        fx.worker.handle(VehicleCommand::Abandon {
            request: request("alice", 1),
        });

        let snap = fx.snapshots.borrow().clone();
        assert_eq!(snap.authority, AuthorityState::Unclaimed);
        assert!(!snap.flags.has_driver);

        let mut bob = request_authority(&mut fx.worker, "bob");
        assert_eq!(bob.try_recv().unwrap(), InteractionResponse::Drive);
    }

    #[test]
    fn test_driver_cannot_also_board() {
        let mut fx = fixture(FaultConfig::default());
        request_authority(&mut fx.worker, "alice");

        let mut commit = ask(&mut fx.worker, |reply| VehicleCommand::Commit {
            request: request("alice", 2),
            mutation: OccupancyMutation::ConfirmPassenger,
            reply,
        });
        assert_eq!(commit.try_recv().unwrap(), InteractionResponse::Refused);
        assert!(!fx.snapshots.borrow().flags.has_passenger);

        let mut bob = ask(&mut fx.worker, |reply| VehicleCommand::RequestBoarding {
            request: request("bob", 1),
            reply,
        });
        assert_eq!(bob.try_recv().unwrap(), InteractionResponse::Passenger);
    }

    #[test]
    fn test_host_id_names_unclaimed_holder() {
        let (tx, _snapshots) = watch::channel(VehicleSnapshot::new("buggy".into()));
        let metrics = Arc::new(VehicleMetrics::new());
        let mut worker = VehicleWorker::new(
            "buggy".into(),
            "server".into(),
            FaultConfig::default(),
            Arc::clone(&metrics),
            tx,
        );

        // A commit by a non-holder against an unclaimed vehicle is stale
        let mut stale = ask(&mut worker, |reply| VehicleCommand::Commit {
            request: request("alice", 1),
            mutation: OccupancyMutation::ConfirmDriver,
            reply,
        });
        assert_eq!(stale.try_recv().unwrap(), InteractionResponse::Refused);
        assert_eq!(metrics.stale_commits(), 1);
        assert_eq!(worker.negotiator.holder().resolve(&worker.host), "server");
    }

    #[test]
    fn test_agent_left_releases_authority_and_parked_requests() {
        let mut fx = fixture(FaultConfig {
            stall_boarding_requests: true,
            ..FaultConfig::default()
        });
        request_authority(&mut fx.worker, "alice");

        let mut bob = ask(&mut fx.worker, |reply| VehicleCommand::RequestBoarding {
            request: request("bob", 1),
            reply,
        });
        fx.worker.handle(VehicleCommand::AgentLeft { agent: "bob".into() });
        // Sender dropped without a value
        assert!(matches!(
            bob.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));

        fx.worker.handle(VehicleCommand::AgentLeft {
            agent: "alice".into(),
        });
        let snap = fx.snapshots.borrow().clone();
        assert_eq!(snap.authority, AuthorityState::Unclaimed);
        assert_eq!(snap.flags, OccupancyFlags::default());
    }

    #[test]
    fn test_dropped_passenger_removal_keeps_flag() {
        let mut fx = fixture(FaultConfig {
            drop_passenger_removals: true,
            ..FaultConfig::default()
        });
        request_authority(&mut fx.worker, "alice");
        ask(&mut fx.worker, |reply| VehicleCommand::RequestBoarding {
            request: request("bob", 1),
            reply,
        });

        fx.worker.handle(VehicleCommand::RemovePassenger {
            request: request("bob", 2),
        });
        assert!(fx.snapshots.borrow().flags.has_passenger);
        assert_eq!(fx.metrics.dropped_commands(), 1);
    }

    #[test]
    fn test_response_to_departed_requester_suppressed() {
        let mut fx = fixture(FaultConfig::default());
        let rx = request_authority(&mut fx.worker, "alice");
        drop(rx);

        let (reply, rx) = oneshot::channel();
        drop(rx);
        fx.worker.handle(VehicleCommand::RequestBoarding {
            request: request("bob", 1),
            reply,
        });
        assert_eq!(fx.metrics.suppressed_responses(), 1);
    }
}
