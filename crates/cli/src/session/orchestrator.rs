//! Session orchestrator - glues occupancy to dynamics.
//!
//! The physics loop runs at a fixed rate and never waits on negotiation.
//! Script actions go to per-agent actors; their results come back as
//! events that are applied at the start of the next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use contracts::{AgentId, Highlighter, ScriptAction, SessionBlueprint, VehicleId};
use dynamics::GroundPlane;
use occupancy::{AgentController, FaultConfig, Placement, VehicleHandle};

use super::rig::VehicleRig;
use super::roster::{agent_actor, LogHighlighter, SessionEvent};
use super::stats::{SessionStats, VehicleSummary};
use crate::error::CliError;

/// How long actors get to finish after the last tick
const ACTOR_GRACE: Duration = Duration::from_millis(100);

/// Session run configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// The validated session blueprint
    pub blueprint: SessionBlueprint,

    /// Holder-side fault injection for every vehicle
    pub faults: FaultConfig,

    /// Pace ticks at `physics_hz` (false = back-to-back)
    pub paced: bool,
}

/// Main session orchestrator
pub struct Session {
    options: SessionOptions,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }

    /// Run the session for `max_ticks`
    #[instrument(name = "session_run", skip(self), fields(session = %self.options.blueprint.session.name))]
    pub async fn run(self) -> Result<SessionStats> {
        let start_time = Instant::now();
        let blueprint = &self.options.blueprint;
        let session = &blueprint.session;
        let dt = session.physics_dt();
        let ground = GroundPlane::inclined(session.ground_height, session.ground_slope_deg);

        // Vehicles
        let mut rigs = Vec::with_capacity(blueprint.vehicles.len());
        for config in &blueprint.vehicles {
            let rig = VehicleRig::spawn(config, session, self.options.faults)
                .with_context(|| format!("Failed to spawn vehicle '{}'", config.id))?;
            rigs.push(rig);
        }
        let handles: Arc<HashMap<VehicleId, VehicleHandle>> = Arc::new(
            rigs.iter()
                .map(|rig| (rig.id().clone(), rig.handle().clone()))
                .collect(),
        );
        info!(vehicles = rigs.len(), faults = ?self.options.faults, "Vehicles spawned");

        // Agents
        let (event_tx, mut event_rx) = mpsc::channel(session.queue_capacity);
        let highlighter: Arc<dyn Highlighter> = Arc::new(LogHighlighter);
        let mut mailboxes: HashMap<AgentId, mpsc::Sender<ScriptAction>> = HashMap::new();
        let mut actors = JoinSet::new();

        for agent in &blueprint.agents {
            let (tx, rx) = mpsc::channel(session.queue_capacity);
            if mailboxes.insert(agent.id.clone(), tx).is_some() {
                return Err(CliError::session_setup(format!("duplicate agent '{}'", agent.id)).into());
            }
            let controller = AgentController::new(agent.id.clone(), Arc::clone(&highlighter))
                .with_request_timeout(session.request_timeout());
            actors.spawn(agent_actor(
                controller,
                Arc::clone(&handles),
                rx,
                event_tx.clone(),
            ));
        }
        drop(event_tx);
        info!(agents = mailboxes.len(), timeout = ?session.request_timeout(), "Agents ready");

        let mut stats = SessionStats {
            agents: mailboxes.len(),
            ..Default::default()
        };

        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / session.physics_hz));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(max_ticks = session.max_ticks, physics_hz = session.physics_hz, "Session running");

        for tick in 0..session.max_ticks {
            if self.options.paced {
                interval.tick().await;
            } else {
                tokio::task::yield_now().await;
            }

            dispatch_script(blueprint, tick, &mailboxes);

            while let Ok(event) = event_rx.try_recv() {
                apply_event(event, &mut rigs, &mut stats);
            }

            for rig in &mut rigs {
                rig.sync_occupancy();
                let report = rig.step(&ground, dt, session.gravity);
                stats
                    .metrics
                    .record_vehicle_step(rig.id(), report.car_speed, report.grounded_wheels);
            }
            stats.metrics.record_tick();
            stats.ticks += 1;
        }

        // Shutdown
        info!("Shutting down session...");
        drop(mailboxes);

        // Actors waiting on unanswered requests never finish on their own
        let drained = tokio::time::timeout(ACTOR_GRACE, async {
            while actors.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(pending = actors.len(), "Agents still waiting on requests, aborting");
            actors.abort_all();
        }
        while let Ok(event) = event_rx.try_recv() {
            apply_event(event, &mut rigs, &mut stats);
        }

        for rig in rigs {
            stats.vehicles.push(VehicleSummary {
                id: rig.id().clone(),
                flags: rig.flags(),
                position: rig.position(),
                metrics: rig.metrics(),
            });
            rig.shutdown().await;
        }

        stats.duration = start_time.elapsed();
        info!(
            ticks = stats.ticks,
            duration_secs = stats.duration.as_secs_f64(),
            "Session shutdown complete"
        );

        Ok(stats)
    }
}

/// Hand this tick's script steps to the agent actors
fn dispatch_script(
    blueprint: &SessionBlueprint,
    tick: u64,
    mailboxes: &HashMap<AgentId, mpsc::Sender<ScriptAction>>,
) {
    for step in blueprint.steps_at(tick) {
        let Some(mailbox) = mailboxes.get(&step.agent) else {
            warn!(tick, agent = %step.agent, "Script step for unknown agent");
            continue;
        };
        match mailbox.try_send(step.action.clone()) {
            Ok(()) => debug!(tick, agent = %step.agent, action = step.action.kind(), "Action dispatched"),
            Err(mpsc::error::TrySendError::Full(action)) => {
                warn!(tick, agent = %step.agent, action = action.kind(), "Agent busy, action dropped")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(tick, agent = %step.agent, "Agent actor closed unexpectedly")
            }
        }
    }
}

fn apply_event(event: SessionEvent, rigs: &mut [VehicleRig], stats: &mut SessionStats) {
    match event {
        SessionEvent::Response {
            agent,
            vehicle,
            response,
            placement,
        } => {
            stats.metrics.record_response(response);
            match placement {
                Placement::Dismounted { offset, .. } => {
                    let position = rigs
                        .iter()
                        .find(|rig| rig.id() == &vehicle)
                        .map(|rig| rig.local_to_world(offset));
                    info!(agent = %agent, vehicle = %vehicle, ?position, "Agent dismounted");
                }
                _ => info!(agent = %agent, vehicle = %vehicle, response = ?response, "Interaction resolved"),
            }
        }
        SessionEvent::TimedOut { agent, vehicle } => {
            stats.metrics.record_timeout();
            warn!(agent = %agent, vehicle = %vehicle, "Interaction timed out");
        }
        SessionEvent::Input {
            agent,
            vehicle,
            input,
        } => match rigs.iter_mut().find(|rig| rig.id() == &vehicle) {
            Some(rig) => rig.apply_input(input),
            None => warn!(agent = %agent, vehicle = %vehicle, "Input for unknown vehicle"),
        },
    }
}
