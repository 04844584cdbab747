//! Agent actors - one task per agent, fed by the input script.
//!
//! Each actor owns its `AgentController` and handles its actions in order.
//! A request that never resolves only blocks that agent; other agents and
//! the physics loop keep running.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use contracts::{
    AgentId, Highlight, Highlighter, InteractionResponse, ScriptAction, VehicleId, VehicleLink,
};
use occupancy::{AgentController, OccupancyError, Placement, VehicleHandle};

use super::rig::DriveInput;

/// What an agent actor reports back to the session loop
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An interaction resolved
    Response {
        agent: AgentId,
        vehicle: VehicleId,
        response: InteractionResponse,
        placement: Placement,
    },
    /// A request was abandoned locally
    TimedOut { agent: AgentId, vehicle: VehicleId },
    /// Driver input for the vehicle the agent drives
    Input {
        agent: AgentId,
        vehicle: VehicleId,
        input: DriveInput,
    },
}

/// Highlight collaborator for headless runs
pub struct LogHighlighter;

impl Highlighter for LogHighlighter {
    fn highlight(&self, vehicle: &VehicleId, highlight: Highlight) {
        debug!(vehicle = %vehicle, ?highlight, "Highlight changed");
    }
}

/// Actor task body
#[instrument(name = "agent_actor", skip_all, fields(agent = %controller.id()))]
pub async fn agent_actor(
    mut controller: AgentController<VehicleHandle>,
    vehicles: Arc<HashMap<VehicleId, VehicleHandle>>,
    mut actions: mpsc::Receiver<ScriptAction>,
    events: mpsc::Sender<SessionEvent>,
) {
    let agent = controller.id().clone();

    while let Some(action) = actions.recv().await {
        debug!(agent = %agent, action = action.kind(), "Action received");

        let event = match action {
            ScriptAction::Focus { vehicle } => {
                match vehicles.get(&vehicle) {
                    Some(handle) => controller.focus(handle.clone()),
                    None => warn!(agent = %agent, vehicle = %vehicle, "Focus on unknown vehicle"),
                }
                None
            }
            ScriptAction::Unfocus => {
                controller.unfocus();
                None
            }
            ScriptAction::Interact => interact(&mut controller).await,
            ScriptAction::Throttle { value } => drive(&controller, DriveInput::Throttle(value)),
            ScriptAction::Steer { value } => drive(&controller, DriveInput::Steer(value)),
            ScriptAction::Reset => drive(&controller, DriveInput::Reset),
        };

        if let Some(event) = event {
            if events.send(event).await.is_err() {
                debug!(agent = %agent, "Session loop gone, actor stopping");
                break;
            }
        }
    }
}

async fn interact(controller: &mut AgentController<VehicleHandle>) -> Option<SessionEvent> {
    let agent = controller.id().clone();
    let vehicle = controller.target().map(|link| link.vehicle_id().clone());

    match controller.interact().await {
        Ok(response) => Some(SessionEvent::Response {
            agent,
            vehicle: vehicle?,
            response,
            placement: controller.placement().clone(),
        }),
        Err(OccupancyError::RequestTimedOut { .. }) => Some(SessionEvent::TimedOut {
            agent,
            vehicle: vehicle?,
        }),
        Err(e) => {
            warn!(agent = %agent, error = %e, "Interaction failed");
            None
        }
    }
}

fn drive(controller: &AgentController<VehicleHandle>, input: DriveInput) -> Option<SessionEvent> {
    match controller.driven_vehicle() {
        Ok(vehicle) => Some(SessionEvent::Input {
            agent: controller.id().clone(),
            vehicle: vehicle.clone(),
            input,
        }),
        Err(e) => {
            debug!(error = %e, ?input, "Input ignored");
            None
        }
    }
}
