//! VehicleRig - one vehicle's authority worker, dynamics model and body.

use nalgebra::Vector3;
use tracing::{debug, info};

use contracts::{OccupancyFlags, SessionConfig, VehicleConfig, VehicleId, VehicleLink};
use dynamics::{yaw_rotation, ChassisBody, GroundPlane, RigidChassis, StepReport, VehicleDynamics};
use occupancy::{FaultConfig, VehicleAuthority, VehicleHandle, VehicleMetricsSnapshot};

use crate::error::CliError;

/// Driver input routed from an agent to its vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveInput {
    Throttle(f32),
    Steer(f32),
    Reset,
}

pub struct VehicleRig {
    authority: VehicleAuthority,
    handle: VehicleHandle,
    dynamics: VehicleDynamics,
    body: RigidChassis,
}

impl VehicleRig {
    /// Spawn the authority worker and place the body at its spawn pose
    pub fn spawn(
        config: &VehicleConfig,
        session: &SessionConfig,
        faults: FaultConfig,
    ) -> Result<Self, CliError> {
        let dynamics = VehicleDynamics::from_config(config)?;
        let [x, y, z] = config.spawn.position;
        let body = RigidChassis::new(config.chassis.mass, config.chassis.size)
            .with_pose(Vector3::new(x, y, z), yaw_rotation(config.spawn.yaw_deg));

        let authority = VehicleAuthority::spawn_hosted(
            config.id.clone(),
            session.host_id.clone(),
            config.seats,
            session.queue_capacity,
            faults,
        );
        let handle = authority.handle();

        Ok(Self {
            authority,
            handle,
            dynamics,
            body,
        })
    }

    pub fn id(&self) -> &VehicleId {
        self.handle.vehicle_id()
    }

    pub fn handle(&self) -> &VehicleHandle {
        &self.handle
    }

    pub fn flags(&self) -> OccupancyFlags {
        self.handle.snapshot().flags
    }

    /// Inputs are live only while a driver is committed
    pub fn sync_occupancy(&mut self) {
        let has_driver = self.flags().has_driver;
        if has_driver && !self.dynamics.is_active() {
            let leveled = self.dynamics.start(&mut self.body);
            info!(vehicle = %self.id(), leveled, "Driver committed, inputs enabled");
        } else if !has_driver && self.dynamics.is_active() {
            self.dynamics.stop();
            info!(vehicle = %self.id(), "Driver seat empty, inputs disabled");
        }
    }

    pub fn apply_input(&mut self, input: DriveInput) {
        if !self.dynamics.is_active() {
            debug!(vehicle = %self.id(), ?input, "Input before driver commit ignored");
            return;
        }
        match input {
            DriveInput::Throttle(value) => self.dynamics.set_acceleration(value),
            DriveInput::Steer(value) => self.dynamics.set_steering(value),
            DriveInput::Reset => self.dynamics.reset_vehicle(&mut self.body),
        }
    }

    /// Wheel forces, body integration, then cosmetic animation
    pub fn step(&mut self, ground: &GroundPlane, dt: f32, gravity: f32) -> StepReport {
        let report = self.dynamics.step(&mut self.body, ground, dt);
        self.body.integrate(dt, Vector3::new(0.0, gravity, 0.0));
        self.dynamics.animate(dt);

        observability::record_grounded_wheels(self.id(), report.grounded_wheels);
        observability::record_vehicle_speed(self.id(), report.car_speed);
        report
    }

    /// Vehicle-local offset to world space
    pub fn local_to_world(&self, offset: [f32; 3]) -> [f32; 3] {
        let point = self
            .body
            .transform_point(&Vector3::new(offset[0], offset[1], offset[2]));
        [point.x, point.y, point.z]
    }

    pub fn position(&self) -> [f32; 3] {
        let p = self.body.position();
        [p.x, p.y, p.z]
    }

    pub fn metrics(&self) -> VehicleMetricsSnapshot {
        self.authority.metrics().snapshot()
    }

    pub async fn shutdown(self) {
        self.authority.shutdown().await;
    }
}
