//! Rigid body seam and a reference implementation.
//!
//! The dynamics model only needs to read the chassis state and accumulate
//! forces into it; integration is left to whatever physics engine owns the
//! body. [`RigidChassis`] is a small semi-implicit Euler body used by the
//! session runner and the tests.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Local forward axis (-Z)
pub fn local_forward() -> Vector3<f32> {
    -Vector3::z()
}

/// Local right axis (+X)
pub fn local_right() -> Vector3<f32> {
    Vector3::x()
}

/// Local up axis (+Y)
pub fn local_up() -> Vector3<f32> {
    Vector3::y()
}

/// Rotation about +Y; positive degrees turn the forward axis to the right.
pub fn yaw_rotation(degrees: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -degrees.to_radians())
}

/// Level orientation keeping the horizontal heading of `forward`.
///
/// Falls back to the world forward heading when `forward` is vertical.
pub fn level_rotation(forward: &Vector3<f32>) -> UnitQuaternion<f32> {
    let heading = Vector3::new(forward.x, 0.0, forward.z);
    let heading = if heading.norm_squared() < 1e-8 {
        local_forward()
    } else {
        heading.normalize()
    };
    UnitQuaternion::face_towards(&(-heading), &Vector3::y())
}

/// Rigid body the vehicle writes forces into.
pub trait ChassisBody {
    fn position(&self) -> Vector3<f32>;

    fn rotation(&self) -> UnitQuaternion<f32>;

    fn linear_velocity(&self) -> Vector3<f32>;

    /// World-space angular velocity (rad/s)
    fn angular_velocity(&self) -> Vector3<f32>;

    /// Accumulate a world-space force applied at a world-space point
    fn add_force_at_position(&mut self, force: Vector3<f32>, point: Vector3<f32>);

    fn set_velocities(&mut self, linear: Vector3<f32>, angular: Vector3<f32>);

    fn set_pose(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>);

    /// Velocity of a world-space point rigidly attached to the body
    fn point_velocity(&self, point: &Vector3<f32>) -> Vector3<f32> {
        self.linear_velocity() + self.angular_velocity().cross(&(point - self.position()))
    }

    fn forward(&self) -> Vector3<f32> {
        self.rotation() * local_forward()
    }

    fn right(&self) -> Vector3<f32> {
        self.rotation() * local_right()
    }

    fn up(&self) -> Vector3<f32> {
        self.rotation() * local_up()
    }

    /// Map a body-local point into world space
    fn transform_point(&self, local: &Vector3<f32>) -> Vector3<f32> {
        self.position() + self.rotation() * local
    }
}

/// Box-shaped rigid body integrated with semi-implicit Euler.
#[derive(Debug, Clone)]
pub struct RigidChassis {
    mass: f32,
    inv_mass: f32,
    /// Inverse of the diagonal body-space inertia tensor
    inv_inertia_local: Vector3<f32>,
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    linear_velocity: Vector3<f32>,
    angular_velocity: Vector3<f32>,
    force_accumulator: Vector3<f32>,
    torque_accumulator: Vector3<f32>,
}

impl RigidChassis {
    /// Solid box of `mass` kg with extents `size` (width, height, length)
    pub fn new(mass: f32, size: [f32; 3]) -> Self {
        let mass = mass.max(f32::EPSILON);
        let [w, h, l] = size;
        let k = mass / 12.0;
        let inertia = Vector3::new(k * (h * h + l * l), k * (w * w + l * l), k * (w * w + h * h));

        Self {
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia_local: inertia.map(|i| if i > f32::EPSILON { 1.0 / i } else { 0.0 }),
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            force_accumulator: Vector3::zeros(),
            torque_accumulator: Vector3::zeros(),
        }
    }

    /// Builder: set the initial pose
    pub fn with_pose(mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        self.position = position;
        self.rotation = rotation;
        self
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Force accumulated since the last integration
    pub fn pending_force(&self) -> Vector3<f32> {
        self.force_accumulator
    }

    /// Torque accumulated since the last integration
    pub fn pending_torque(&self) -> Vector3<f32> {
        self.torque_accumulator
    }

    /// Advance by `dt` seconds under `gravity` and clear the accumulators.
    ///
    /// Velocities are updated first, then the pose.
    pub fn integrate(&mut self, dt: f32, gravity: Vector3<f32>) {
        let acceleration = gravity + self.force_accumulator * self.inv_mass;
        self.linear_velocity += acceleration * dt;
        self.position += self.linear_velocity * dt;

        let angular_acceleration = self.inverse_inertia_world() * self.torque_accumulator;
        self.angular_velocity += angular_acceleration * dt;
        let delta = UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);
        self.rotation = delta * self.rotation;
        self.rotation.renormalize_fast();

        self.force_accumulator = Vector3::zeros();
        self.torque_accumulator = Vector3::zeros();
    }

    fn inverse_inertia_world(&self) -> Matrix3<f32> {
        let r = self.rotation.to_rotation_matrix();
        r.matrix() * Matrix3::from_diagonal(&self.inv_inertia_local) * r.matrix().transpose()
    }
}

impl ChassisBody for RigidChassis {
    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    fn linear_velocity(&self) -> Vector3<f32> {
        self.linear_velocity
    }

    fn angular_velocity(&self) -> Vector3<f32> {
        self.angular_velocity
    }

    fn add_force_at_position(&mut self, force: Vector3<f32>, point: Vector3<f32>) {
        self.force_accumulator += force;
        self.torque_accumulator += (point - self.position).cross(&force);
    }

    fn set_velocities(&mut self, linear: Vector3<f32>, angular: Vector3<f32>) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    fn set_pose(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) {
        self.position = position;
        self.rotation = rotation;
    }
}
