//! # Dynamics
//!
//! Wheel-based vehicle dynamics executed once per fixed physics step.
//!
//! Responsibilities:
//! - Per-wheel raycast suspension, tire grip and drivetrain forces
//! - Visual steering and wheel animation
//! - Input lifecycle (`start` / `stop`) and vehicle recovery
//!
//! The model never blocks and never integrates the body itself: forces are
//! accumulated into a [`ChassisBody`] owned by the caller.
//!
//! ## Usage
//!
//! ```
//! use contracts::{default_wheels, DynamicsConfig};
//! use dynamics::{GroundPlane, RigidChassis, VehicleDynamics};
//! use nalgebra::{UnitQuaternion, Vector3};
//!
//! let mut vehicle =
//!     VehicleDynamics::new("buggy".into(), &default_wheels(), DynamicsConfig::default()).unwrap();
//! let mut body = RigidChassis::new(1200.0, [1.8, 1.0, 4.0])
//!     .with_pose(Vector3::new(0.0, 0.8, 0.0), UnitQuaternion::identity());
//! let ground = GroundPlane::flat(0.0);
//!
//! vehicle.start(&mut body);
//! vehicle.set_acceleration(1.0);
//! let report = vehicle.step(&mut body, &ground, 0.02);
//! body.integrate(0.02, Vector3::new(0.0, -9.81, 0.0));
//! vehicle.animate(0.02);
//! assert_eq!(report.grounded_wheels, 4);
//! ```

mod body;
mod ground;
mod steering;
mod suspension;
mod vehicle;

pub use body::{
    level_rotation, local_forward, local_right, local_up, yaw_rotation, ChassisBody, RigidChassis,
};
pub use ground::{GroundPlane, GroundProbe, RayHit};
pub use steering::{RearSteerMode, SteeringAnimator};
pub use suspension::{
    normalize_speed, DriveState, SuspensionSolver, WheelContact, WheelForces, WheelFrame,
};
pub use vehicle::{StepReport, VehicleDynamics, WheelState};
