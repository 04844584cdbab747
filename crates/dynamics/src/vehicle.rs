//! Vehicle dynamics orchestration.
//!
//! One [`VehicleDynamics`] per vehicle. Each fixed step it probes the ground
//! under every wheel, runs the [`SuspensionSolver`] and accumulates the
//! resulting forces into the chassis body. Wheels are always processed in
//! [`WheelRole::ALL`] order so a step is deterministic.

use contracts::{ContractError, DynamicsConfig, VehicleConfig, VehicleId, WheelConfig, WheelRole};
use nalgebra::Vector3;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

use crate::body::{level_rotation, ChassisBody};
use crate::ground::GroundProbe;
use crate::steering::SteeringAnimator;
use crate::suspension::{normalize_speed, DriveState, SuspensionSolver, WheelContact, WheelFrame};

/// Outcome of one physics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Wheels whose probe hit the ground
    pub grounded_wheels: usize,
    /// Forward speed (m/s), negative when reversing
    pub car_speed: f32,
    pub normalized_speed: f32,
    /// Four-wheel steering currently in low-speed counter-steer mode
    pub low_speed_steer: bool,
}

/// Per-wheel runtime state
#[derive(Debug, Clone)]
pub struct WheelState {
    pub contact: WheelContact,
    /// Probe distance of the last step, `None` while airborne
    pub last_hit_distance: Option<f32>,
    /// Contact velocity along the wheel's rolling direction
    pub rolling_speed: f32,
    /// Cosmetic spin angle in degrees, [0, 360)
    pub spin_deg: f32,
    /// Cosmetic vertical offset of the wheel mesh
    pub mesh_offset: f32,
}

/// Drives one four-wheeled chassis.
#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    vehicle: VehicleId,
    solver: SuspensionSolver,
    steering: SteeringAnimator,
    wheels: Vec<WheelState>,
    acceleration: f32,
    steering_input: f32,
    active: bool,
}

impl VehicleDynamics {
    /// Build from a wheel set of exactly four distinct roles.
    ///
    /// # Errors
    /// `InvalidWheelLayout` when the wheel set is not one wheel per role.
    pub fn new(
        vehicle: VehicleId,
        wheels: &[WheelConfig],
        config: DynamicsConfig,
    ) -> Result<Self, ContractError> {
        if wheels.len() != WheelRole::ALL.len() {
            return Err(ContractError::invalid_wheel_layout(format!(
                "vehicle '{vehicle}' needs 4 wheels, got {}",
                wheels.len()
            )));
        }
        let roles: HashSet<_> = wheels.iter().map(|wheel| wheel.role).collect();
        if roles.len() != WheelRole::ALL.len() {
            return Err(ContractError::invalid_wheel_layout(format!(
                "vehicle '{vehicle}' has duplicate wheel roles"
            )));
        }

        let mut contacts: Vec<WheelContact> = wheels.iter().map(WheelContact::from).collect();
        contacts.sort_by_key(|contact| WheelRole::ALL.iter().position(|r| *r == contact.role));

        let config = config.resolved();
        let steering = SteeringAnimator::new(
            config.steering.clone(),
            config.four_wheel_steering,
            config.crab_steer_at_high_speeds,
            contacts.iter().map(|contact| contact.role),
        );
        let wheels = contacts
            .into_iter()
            .map(|contact| WheelState {
                contact,
                last_hit_distance: None,
                rolling_speed: 0.0,
                spin_deg: 0.0,
                mesh_offset: 0.0,
            })
            .collect();

        Ok(Self {
            vehicle,
            solver: SuspensionSolver::new(config),
            steering,
            wheels,
            acceleration: 0.0,
            steering_input: 0.0,
            active: false,
        })
    }

    /// Build from a vehicle blueprint
    pub fn from_config(config: &VehicleConfig) -> Result<Self, ContractError> {
        Self::new(config.id.clone(), &config.wheels, config.dynamics.clone())
    }

    pub fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle
    }

    pub fn config(&self) -> &DynamicsConfig {
        self.solver.config()
    }

    /// Enable driver input, righting the body first if it has tipped over.
    ///
    /// Returns true when the body was re-leveled.
    pub fn start<B: ChassisBody>(&mut self, body: &mut B) -> bool {
        self.active = true;
        if body.up().y >= self.config().upright_threshold {
            return false;
        }

        let rotation = level_rotation(&body.forward());
        body.set_pose(body.position(), rotation);
        debug!(vehicle = %self.vehicle, "leveled tipped vehicle on start");
        true
    }

    /// Disable driver input and zero both inputs
    pub fn stop(&mut self) {
        self.active = false;
        self.acceleration = 0.0;
        self.set_steering_unchecked(0.0);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Acceleration input; ignored while stopped
    pub fn set_acceleration(&mut self, value: f32) {
        if self.active && value.is_finite() {
            self.acceleration = value.clamp(-1.0, 1.0);
        }
    }

    /// Steering input, positive right; ignored while stopped
    pub fn set_steering(&mut self, value: f32) {
        if self.active && value.is_finite() {
            self.set_steering_unchecked(value.clamp(-1.0, 1.0));
        }
    }

    /// (acceleration, steering)
    pub fn inputs(&self) -> (f32, f32) {
        (self.acceleration, self.steering_input)
    }

    pub fn wheels(&self) -> &[WheelState] {
        &self.wheels
    }

    pub fn steering(&self) -> &SteeringAnimator {
        &self.steering
    }

    /// Run one fixed physics step, accumulating wheel forces into `body`.
    ///
    /// Airborne wheels contribute nothing.
    #[instrument(level = "trace", name = "vehicle_step", skip_all, fields(vehicle = %self.vehicle))]
    pub fn step<B, G>(&mut self, body: &mut B, ground: &G, dt: f32) -> StepReport
    where
        B: ChassisBody,
        G: GroundProbe + ?Sized,
    {
        let config = self.solver.config();
        let car_speed = body.forward().dot(&body.linear_velocity());
        let normalized_speed = normalize_speed(car_speed, config.top_speed);

        if config.four_wheel_steering {
            let low_speed = config.four_wheel_steering_curve.evaluate(normalized_speed) >= 1.0;
            self.steering.set_low_speed(low_speed);
        }

        let drive = DriveState {
            acceleration: self.acceleration,
            steering: self.steering_input,
            car_speed,
            normalized_speed,
        };
        let probe_length = self.solver.probe_length();
        // Probes point straight down in world space, whatever the body attitude
        let down = -Vector3::y();
        let body_rotation = body.rotation();

        let mut grounded_wheels = 0;
        for wheel in &mut self.wheels {
            let origin = body.transform_point(&wheel.contact.mount);
            let Some(hit) = ground.cast(&origin, &down, probe_length) else {
                wheel.last_hit_distance = None;
                wheel.rolling_speed = 0.0;
                continue;
            };
            grounded_wheels += 1;

            let wheel_rotation = body_rotation * self.steering.rotation(wheel.contact.role);
            let frame = WheelFrame {
                role: wheel.contact.role,
                origin,
                forward: wheel_rotation * crate::body::local_forward(),
                right: wheel_rotation * crate::body::local_right(),
                velocity: body.point_velocity(&origin),
            };
            let forces = self.solver.solve(&frame, &hit, &drive, dt);
            body.add_force_at_position(forces.total(), origin);

            wheel.last_hit_distance = Some(hit.distance);
            wheel.rolling_speed = frame.forward.dot(&frame.velocity);

            trace!(
                wheel = wheel.contact.role.as_str(),
                distance = hit.distance,
                suspension = forces.suspension.norm(),
                lateral = forces.lateral.norm(),
                drive = forces.drive.norm(),
                "wheel forces"
            );
        }

        StepReport {
            grounded_wheels,
            car_speed,
            normalized_speed,
            low_speed_steer: self.steering.is_low_speed(),
        }
    }

    /// Advance cosmetic state: steering interpolation, wheel spin and mesh follow.
    pub fn animate(&mut self, dt: f32) {
        self.steering.tick(dt);

        let config = self.solver.config();
        let circumference = std::f32::consts::TAU * config.wheel_radius;
        let rest = config.suspension.rest_distance;
        let probe_length = config.suspension.probe_length();
        let follow = (config.mesh_follow_rate * dt).clamp(0.0, 1.0);

        for wheel in &mut self.wheels {
            let revolutions = wheel.rolling_speed / circumference * dt;
            wheel.spin_deg = (wheel.spin_deg + revolutions * 360.0).rem_euclid(360.0);

            let distance = wheel.last_hit_distance.unwrap_or(probe_length);
            let target = rest - distance;
            wheel.mesh_offset += (target - wheel.mesh_offset) * follow;
        }
    }

    /// Recovery: zero input and velocity, lift the body and level it.
    pub fn reset_vehicle<B: ChassisBody>(&mut self, body: &mut B) {
        self.acceleration = 0.0;
        self.steering_input = 0.0;
        self.steering.reset();

        body.set_velocities(Vector3::zeros(), Vector3::zeros());
        let position = body.position() + Vector3::y() * self.config().reset_lift;
        let rotation = level_rotation(&body.forward());
        body.set_pose(position, rotation);

        debug!(vehicle = %self.vehicle, "vehicle reset");
    }

    fn set_steering_unchecked(&mut self, value: f32) {
        self.steering_input = value;
        self.steering.set_input(value);
    }
}
