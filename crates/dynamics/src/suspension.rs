//! Per-wheel force model: raycast spring-damper suspension, lateral tire grip
//! and drivetrain.
//!
//! Every function here is pure. [`SuspensionSolver::solve`] turns one wheel's
//! contact into forces; the caller accumulates them into the shared body.

use contracts::{DynamicsConfig, WheelConfig, WheelRole};
use nalgebra::Vector3;

use crate::ground::RayHit;

/// Below this forward speed (m/s) a reverse request is not a brake request
const DIRECTION_DEADBAND: f32 = 0.1;

/// Static wheel descriptor, fixed at vehicle creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelContact {
    pub role: WheelRole,
    /// Mount point in body-local space
    pub mount: Vector3<f32>,
}

impl From<&WheelConfig> for WheelContact {
    fn from(config: &WheelConfig) -> Self {
        let [x, y, z] = config.mount;
        Self {
            role: config.role,
            mount: Vector3::new(x, y, z),
        }
    }
}

/// World-space frame of one wheel for the current step.
#[derive(Debug, Clone, Copy)]
pub struct WheelFrame {
    pub role: WheelRole,
    /// Mount point in world space; forces are applied here
    pub origin: Vector3<f32>,
    /// Rolling direction including the current steering yaw
    pub forward: Vector3<f32>,
    /// Lateral slip direction including the current steering yaw
    pub right: Vector3<f32>,
    /// Velocity of the body at `origin`
    pub velocity: Vector3<f32>,
}

/// Vehicle-wide quantities shared by all four wheels in one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveState {
    /// Acceleration input in [-1, 1]
    pub acceleration: f32,
    /// Steering input in [-1, 1], positive turns right
    pub steering: f32,
    /// Body velocity along its forward axis (m/s)
    pub car_speed: f32,
    /// `|car_speed| / top_speed` clamped to [0, 1]
    pub normalized_speed: f32,
}

/// Forces produced by one grounded wheel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelForces {
    pub suspension: Vector3<f32>,
    pub lateral: Vector3<f32>,
    pub drive: Vector3<f32>,
}

impl WheelForces {
    pub fn total(&self) -> Vector3<f32> {
        self.suspension + self.lateral + self.drive
    }
}

/// Clamp `speed / limit` into [0, 1]; non-positive limits count as saturated.
pub fn normalize_speed(speed: f32, limit: f32) -> f32 {
    if limit <= 0.0 || !speed.is_finite() {
        return 1.0;
    }
    (speed.abs() / limit).clamp(0.0, 1.0)
}

/// Force model for one wheel, built from a vehicle's tuning.
#[derive(Debug, Clone)]
pub struct SuspensionSolver {
    config: DynamicsConfig,
}

impl SuspensionSolver {
    /// `config` should already be resolved (see [`DynamicsConfig::resolved`])
    pub fn new(config: DynamicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DynamicsConfig {
        &self.config
    }

    /// Maximum probe length below the mount
    pub fn probe_length(&self) -> f32 {
        self.config.suspension.probe_length()
    }

    /// Compute all forces of a grounded wheel.
    pub fn solve(&self, frame: &WheelFrame, hit: &RayHit, drive: &DriveState, dt: f32) -> WheelForces {
        let dt = dt.max(f32::EPSILON);
        WheelForces {
            suspension: self.suspension_force(frame, hit),
            lateral: self.lateral_force(frame, drive, dt),
            drive: self.drive_force(frame, drive, dt),
        }
    }

    /// Spring-damper along the contact normal
    pub fn suspension_force(&self, frame: &WheelFrame, hit: &RayHit) -> Vector3<f32> {
        let suspension = &self.config.suspension;
        let offset = suspension.rest_distance - hit.distance;
        let closing_velocity = hit.normal.dot(&frame.velocity);
        let magnitude = offset * suspension.spring_strength - closing_velocity * suspension.spring_damper;
        hit.normal * magnitude
    }

    /// Grip opposing lateral slip, weakened on the inside of a turn
    pub fn lateral_force(&self, frame: &WheelFrame, drive: &DriveState, dt: f32) -> Vector3<f32> {
        let slip_velocity = frame.right.dot(&frame.velocity);
        let grip = self.grip(frame.role, drive.normalized_speed);
        let desired_change = -slip_velocity * grip;
        let inner = self.inner_wheel_factor(frame.role, drive.steering);

        frame.right * (self.config.tire_mass * desired_change / dt) * inner
    }

    /// Forward torque, reverse torque, braking or idle rolling resistance
    pub fn drive_force(&self, frame: &WheelFrame, drive: &DriveState, dt: f32) -> Vector3<f32> {
        let config = &self.config;
        let input = drive.acceleration;
        let rolling_velocity = frame.forward.dot(&frame.velocity);

        let braking = (input > 0.0 && drive.car_speed < -DIRECTION_DEADBAND)
            || (input < 0.0 && drive.car_speed > DIRECTION_DEADBAND);
        if braking {
            let brake = config.brake_curve.evaluate(drive.normalized_speed);
            return frame.forward * (config.tire_mass * (-rolling_velocity * brake) / dt);
        }

        let power = self.role_power(frame.role);
        if input > 0.0 {
            if drive.normalized_speed >= 1.0 {
                return Vector3::zeros();
            }
            let torque = config.torque_curve.evaluate(drive.normalized_speed) * input * power;
            return frame.forward * torque;
        }

        if input < 0.0 {
            let reverse_cap = config.top_speed * config.reverse_speed_limit;
            let reverse_norm = normalize_speed(drive.car_speed, reverse_cap);
            if reverse_norm >= 1.0 {
                return Vector3::zeros();
            }
            let torque = config.reverse_torque_curve.evaluate(reverse_norm) * input * power;
            return frame.forward * torque;
        }

        if drive.normalized_speed > 0.0 {
            let resistance =
                self.grip(frame.role, drive.normalized_speed) * config.resting_grip_factor;
            return frame.forward * (config.tire_mass * (-rolling_velocity * resistance) / dt);
        }

        Vector3::zeros()
    }

    /// Tire grip at a normalized speed (clamped again here)
    pub fn grip(&self, role: WheelRole, normalized_speed: f32) -> f32 {
        let config = &self.config;
        let t = normalized_speed.clamp(0.0, 1.0);
        match (config.use_grip_curves, role.is_front()) {
            (true, true) => config.front_grip_curve.evaluate(t),
            (true, false) => config.rear_grip_curve.evaluate(t),
            (false, true) => config.front_grip,
            (false, false) => config.rear_grip,
        }
    }

    fn role_power(&self, role: WheelRole) -> f32 {
        let factor = if role.is_front() {
            self.config.front_drive_power_factor
        } else {
            self.config.rear_drive_power_factor
        };
        factor * self.config.acceleration_power
    }

    fn inner_wheel_factor(&self, role: WheelRole, steering: f32) -> f32 {
        let inner = (steering < 0.0 && role.is_left()) || (steering > 0.0 && !role.is_left());
        if inner {
            self.config.inner_wheel_turning_power
        } else {
            1.0
        }
    }
}
