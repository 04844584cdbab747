//! SessionBlueprint - Config Loader output
//!
//! Describes a complete shared session: physics settings, vehicles with their
//! wheels, seats and tuning, the participating agents and an optional input
//! script.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::{AgentId, DynamicsConfig, VehicleId};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Session-wide settings
    #[validate(nested)]
    pub session: SessionConfig,

    /// Vehicle definitions
    #[validate(length(min = 1), nested)]
    pub vehicles: Vec<VehicleConfig>,

    /// Participating agents
    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    /// Scripted input, replayed by `coride run`
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

impl SessionBlueprint {
    /// Look up a vehicle definition by id
    pub fn vehicle(&self, id: &str) -> Option<&VehicleConfig> {
        self.vehicles.iter().find(|vehicle| vehicle.id == id)
    }

    /// Look up an agent definition by id
    pub fn agent(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Script steps scheduled for `tick`, in file order
    pub fn steps_at(&self, tick: u64) -> impl Iterator<Item = &ScriptStep> {
        self.script.iter().filter(move |step| step.tick == tick)
    }
}

/// Session-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Human readable session name
    #[validate(length(min = 1))]
    pub name: String,

    /// Default authority owner for unclaimed vehicles
    #[serde(default = "default_host_id")]
    pub host_id: AgentId,

    /// Fixed physics rate (Hz)
    #[serde(default = "default_physics_hz")]
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub physics_hz: f64,

    /// Gravity along world Y (m/s²)
    #[serde(default = "default_gravity")]
    pub gravity: f32,

    /// Height of the ground plane at the origin
    #[serde(default)]
    pub ground_height: f32,

    /// Ground incline (degrees) rising toward world -Z
    #[serde(default)]
    #[validate(range(min = -60.0, max = 60.0))]
    pub ground_slope_deg: f32,

    /// Local abandon timeout for interaction requests (0 = wait forever)
    #[serde(default)]
    pub request_timeout_ms: u64,

    /// Ticks simulated by `coride run`
    #[serde(default = "default_max_ticks")]
    #[validate(range(min = 1))]
    pub max_ticks: u64,

    /// Command queue capacity of each vehicle worker
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

impl SessionConfig {
    /// Fixed physics step in seconds
    pub fn physics_dt(&self) -> f32 {
        (1.0 / self.physics_hz) as f32
    }

    /// `None` when requests wait indefinitely
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn default_host_id() -> AgentId {
    AgentId::new("host")
}

fn default_physics_hz() -> f64 {
    50.0
}

fn default_gravity() -> f32 {
    -9.81
}

fn default_max_ticks() -> u64 {
    500
}

fn default_queue_capacity() -> usize {
    64
}

/// Position plus heading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// (x, y, z) in meters
    pub position: [f32; 3],

    /// Heading in degrees, positive turns right
    #[serde(default)]
    pub yaw_deg: f32,
}

impl Pose {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            yaw_deg: 0.0,
        }
    }
}

/// Seat anchors in vehicle-local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeatLayout {
    pub driver: Pose,
    pub passenger: Pose,
}

impl Default for SeatLayout {
    fn default() -> Self {
        Self {
            driver: Pose::at(-0.4, 0.5, 0.0),
            passenger: Pose::at(0.4, 0.5, 0.0),
        }
    }
}

/// Rigid body parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct ChassisConfig {
    /// Mass in kg
    #[validate(range(exclusive_min = 0.0))]
    pub mass: f32,

    /// Box extents (width, height, length) in meters
    pub size: [f32; 3],
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            size: [1.8, 1.0, 4.0],
        }
    }
}

/// Drive role of a wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelRole {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelRole {
    pub const ALL: [WheelRole; 4] = [
        WheelRole::FrontLeft,
        WheelRole::FrontRight,
        WheelRole::RearLeft,
        WheelRole::RearRight,
    ];

    pub fn is_front(&self) -> bool {
        matches!(self, WheelRole::FrontLeft | WheelRole::FrontRight)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelRole::FrontLeft | WheelRole::RearLeft)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelRole::FrontLeft => "front_left",
            WheelRole::FrontRight => "front_right",
            WheelRole::RearLeft => "rear_left",
            WheelRole::RearRight => "rear_right",
        }
    }
}

/// Static wheel descriptor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub role: WheelRole,

    /// Mount point in vehicle-local space (forward is -Z)
    pub mount: [f32; 3],
}

/// Vehicle definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VehicleConfig {
    /// Unique identifier
    pub id: VehicleId,

    /// Initial pose
    #[serde(default)]
    pub spawn: Pose,

    #[serde(default)]
    pub seats: SeatLayout,

    #[serde(default)]
    #[validate(nested)]
    pub chassis: ChassisConfig,

    /// Exactly one wheel per role
    #[serde(default = "default_wheels")]
    pub wheels: Vec<WheelConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub dynamics: DynamicsConfig,
}

/// Wheels at the corners of the default chassis
pub fn default_wheels() -> Vec<WheelConfig> {
    vec![
        WheelConfig {
            role: WheelRole::FrontLeft,
            mount: [-0.8, -0.3, -1.4],
        },
        WheelConfig {
            role: WheelRole::FrontRight,
            mount: [0.8, -0.3, -1.4],
        },
        WheelConfig {
            role: WheelRole::RearLeft,
            mount: [-0.8, -0.3, 1.4],
        },
        WheelConfig {
            role: WheelRole::RearRight,
            mount: [0.8, -0.3, 1.4],
        },
    ]
}

/// Agent definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentId,
}

/// One scripted input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Physics tick at which the action fires
    pub tick: u64,

    /// Acting agent
    pub agent: AgentId,

    pub action: ScriptAction,
}

/// Input an external collaborator would deliver to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Forward probe found this vehicle
    Focus { vehicle: VehicleId },
    /// Forward probe lost its target
    Unfocus,
    /// Interact button
    Interact,
    /// Acceleration input in [-1, 1]
    Throttle { value: f32 },
    /// Steering input in [-1, 1]
    Steer { value: f32 },
    /// Vehicle recovery trigger
    Reset,
}

impl ScriptAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptAction::Focus { .. } => "focus",
            ScriptAction::Unfocus => "unfocus",
            ScriptAction::Interact => "interact",
            ScriptAction::Throttle { .. } => "throttle",
            ScriptAction::Steer { .. } => "steer",
            ScriptAction::Reset => "reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> SessionBlueprint {
        SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionConfig {
                name: "lot".into(),
                host_id: default_host_id(),
                physics_hz: 50.0,
                gravity: -9.81,
                ground_height: 0.0,
                ground_slope_deg: 0.0,
                request_timeout_ms: 0,
                max_ticks: 10,
                queue_capacity: 8,
            },
            vehicles: vec![VehicleConfig {
                id: "buggy".into(),
                spawn: Pose::default(),
                seats: SeatLayout::default(),
                chassis: ChassisConfig::default(),
                wheels: default_wheels(),
                dynamics: DynamicsConfig::default(),
            }],
            agents: vec![AgentConfig { id: "alice".into() }],
            script: vec![
                ScriptStep {
                    tick: 0,
                    agent: "alice".into(),
                    action: ScriptAction::Focus {
                        vehicle: "buggy".into(),
                    },
                },
                ScriptStep {
                    tick: 1,
                    agent: "alice".into(),
                    action: ScriptAction::Interact,
                },
            ],
        }
    }

    #[test]
    fn session_timing_helpers() {
        let blueprint = sample_blueprint();
        assert!((blueprint.session.physics_dt() - 0.02).abs() < 1e-6);
        assert_eq!(blueprint.session.request_timeout(), None);

        let mut session = blueprint.session.clone();
        session.request_timeout_ms = 250;
        assert_eq!(
            session.request_timeout(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn lookups_and_script_filter() {
        let blueprint = sample_blueprint();
        assert!(blueprint.vehicle("buggy").is_some());
        assert!(blueprint.vehicle("truck").is_none());
        assert!(blueprint.agent("alice").is_some());

        let steps: Vec<_> = blueprint.steps_at(1).collect();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, ScriptAction::Interact);
    }

    #[test]
    fn script_action_tagged_by_kind() {
        let action: ScriptAction =
            serde_json::from_str(r#"{"kind":"throttle","value":0.5}"#).unwrap();
        assert_eq!(action, ScriptAction::Throttle { value: 0.5 });
        assert_eq!(action.kind(), "throttle");
    }

    #[test]
    fn default_wheels_cover_every_role() {
        let wheels = default_wheels();
        for role in WheelRole::ALL {
            assert_eq!(wheels.iter().filter(|w| w.role == role).count(), 1);
        }
        assert!(wheels
            .iter()
            .filter(|w| w.role.is_front())
            .all(|w| w.mount[2] < 0.0));
    }

    #[test]
    fn validate_rejects_zero_physics_rate() {
        let mut blueprint = sample_blueprint();
        assert!(blueprint.validate().is_ok());

        blueprint.session.physics_hz = 0.0;
        assert!(blueprint.validate().is_err());
    }
}
