//! Vehicle dynamics tuning contracts that can be shared across crates.
//!
//! Every response table is a [`ResponseCurve`] over the normalized domain
//! [0, 1]; the default shapes are documented on the functions producing them.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Piecewise-linear response table over [0, 1].
///
/// Keys are `[t, value]` pairs with strictly increasing `t`. Evaluation clamps
/// the input into [0, 1], holds the end values flat outside the first/last key
/// and interpolates linearly in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCurve {
    keys: Vec<[f32; 2]>,
}

impl ResponseCurve {
    /// Build from raw keys (not checked; see [`ResponseCurve::check`])
    pub fn new(keys: Vec<[f32; 2]>) -> Self {
        Self { keys }
    }

    /// Flat curve
    pub fn constant(value: f32) -> Self {
        Self::new(vec![[0.0, value], [1.0, value]])
    }

    /// Straight line from `start` at 0 to `end` at 1
    pub fn linear(start: f32, end: f32) -> Self {
        Self::new(vec![[0.0, start], [1.0, end]])
    }

    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    /// Sample the curve. Non-finite input samples at 0.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };

        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        if t <= first[0] {
            return first[1];
        }
        if t >= last[0] {
            return last[1];
        }

        for pair in self.keys.windows(2) {
            let [t0, v0] = pair[0];
            let [t1, v1] = pair[1];
            if t <= t1 {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * (t - t0) / span;
            }
        }
        last[1]
    }

    /// Check key domain and ordering.
    ///
    /// Returns a human readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            return Err("curve needs at least one key".to_string());
        }
        for (idx, [t, v]) in self.keys.iter().enumerate() {
            if !t.is_finite() || !v.is_finite() {
                return Err(format!("key {idx} is not finite"));
            }
            if !(0.0..=1.0).contains(t) {
                return Err(format!("key {idx} has t={t} outside [0, 1]"));
            }
        }
        if self.keys.windows(2).any(|pair| pair[1][0] <= pair[0][0]) {
            return Err("key t values must be strictly increasing".to_string());
        }
        Ok(())
    }
}

/// Full dynamics tuning for one vehicle
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Forward speed (m/s) mapped to normalized speed 1.0
    #[validate(range(exclusive_min = 0.0))]
    pub top_speed: f32,

    /// Drive force per wheel (N) at full torque and full input
    #[validate(range(min = 0.0))]
    pub acceleration_power: f32,

    /// Forward torque by normalized speed
    pub torque_curve: ResponseCurve,

    /// Reverse torque by normalized reverse speed
    pub reverse_torque_curve: ResponseCurve,

    /// Fraction of forward contact velocity removed per step while braking
    pub brake_curve: ResponseCurve,

    /// Reverse speed cap as a fraction of `top_speed`
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub reverse_speed_limit: f32,

    /// Rear wheels steer too
    pub four_wheel_steering: bool,

    /// Rear wheels follow the front angle outside low-speed mode
    pub crab_steer_at_high_speeds: bool,

    /// Sampled by normalized speed; values >= 1.0 select low-speed counter-steer
    pub four_wheel_steering_curve: ResponseCurve,

    /// Lateral force fraction kept by wheels on the inside of a turn
    #[validate(range(min = 0.0, max = 1.0))]
    pub inner_wheel_turning_power: f32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub front_drive_power_factor: f32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub rear_drive_power_factor: f32,

    /// Scales grip into rolling resistance when there is no input
    #[validate(range(min = 0.0, max = 1.0))]
    pub resting_grip_factor: f32,

    /// Effective mass per tire (kg) used to turn velocity changes into force
    #[validate(range(exclusive_min = 0.0))]
    pub tire_mass: f32,

    /// Sample grip from curves instead of the constant strengths
    pub use_grip_curves: bool,

    /// When false the rear tires reuse the front grip settings
    pub distinct_front_rear_grip: bool,

    #[validate(range(min = 0.0, max = 1.0))]
    pub front_grip: f32,

    #[validate(range(min = 0.0, max = 1.0))]
    pub rear_grip: f32,

    pub front_grip_curve: ResponseCurve,
    pub rear_grip_curve: ResponseCurve,

    #[validate(nested)]
    pub suspension: SuspensionConfig,

    #[validate(nested)]
    pub steering: SteeringConfig,

    /// Visual wheel radius (m); spin uses its circumference
    #[validate(range(exclusive_min = 0.0))]
    pub wheel_radius: f32,

    /// Rate (1/s) at which the wheel mesh follows the suspension offset
    #[validate(range(min = 0.0))]
    pub mesh_follow_rate: f32,

    /// Up-vector y below which the body counts as tipped over
    #[validate(range(min = -1.0, max = 1.0))]
    pub upright_threshold: f32,

    /// Upward nudge (m) applied by a vehicle reset
    #[validate(range(min = 0.0))]
    pub reset_lift: f32,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            top_speed: 25.0,
            acceleration_power: 1500.0,
            torque_curve: default_torque_curve(),
            reverse_torque_curve: default_reverse_torque_curve(),
            brake_curve: default_brake_curve(),
            reverse_speed_limit: 0.4,
            four_wheel_steering: false,
            crab_steer_at_high_speeds: false,
            four_wheel_steering_curve: default_four_wheel_steering_curve(),
            inner_wheel_turning_power: 1.0,
            front_drive_power_factor: 1.0,
            rear_drive_power_factor: 1.0,
            resting_grip_factor: 0.5,
            tire_mass: 20.0,
            use_grip_curves: true,
            distinct_front_rear_grip: true,
            front_grip: 0.8,
            rear_grip: 0.8,
            front_grip_curve: default_front_grip_curve(),
            rear_grip_curve: default_rear_grip_curve(),
            suspension: SuspensionConfig::default(),
            steering: SteeringConfig::default(),
            wheel_radius: 0.5,
            mesh_follow_rate: 4.0,
            upright_threshold: 0.5,
            reset_lift: 2.0,
        }
    }
}

impl DynamicsConfig {
    /// Apply `distinct_front_rear_grip = false` by copying front grip to the rear
    pub fn resolved(mut self) -> Self {
        if !self.distinct_front_rear_grip {
            self.rear_grip = self.front_grip;
            self.rear_grip_curve = self.front_grip_curve.clone();
        }
        self
    }

    /// All curves with their config field names, for validation and display
    pub fn curves(&self) -> [(&'static str, &ResponseCurve); 6] {
        [
            ("torque_curve", &self.torque_curve),
            ("reverse_torque_curve", &self.reverse_torque_curve),
            ("brake_curve", &self.brake_curve),
            ("four_wheel_steering_curve", &self.four_wheel_steering_curve),
            ("front_grip_curve", &self.front_grip_curve),
            ("rear_grip_curve", &self.rear_grip_curve),
        ]
    }
}

/// Raycast spring-damper suspension
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SuspensionConfig {
    /// Distance (m) from wheel mount to ground at which the spring is relaxed
    #[validate(range(exclusive_min = 0.0))]
    pub rest_distance: f32,

    /// Spring rate (N/m)
    #[validate(range(min = 0.0))]
    pub spring_strength: f32,

    /// Damping (N·s/m) along the contact normal
    #[validate(range(min = 0.0))]
    pub spring_damper: f32,

    /// Extra probe length (m) past the rest distance
    #[validate(range(min = 0.0))]
    pub lower_extent_limit: f32,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            rest_distance: 0.5,
            spring_strength: 30_000.0,
            spring_damper: 3_000.0,
            lower_extent_limit: 0.3,
        }
    }
}

impl SuspensionConfig {
    /// Maximum ground probe length
    pub fn probe_length(&self) -> f32 {
        self.rest_distance + self.lower_extent_limit
    }
}

/// Visual steering
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SteeringConfig {
    /// Front wheel yaw (degrees) at full lock
    #[validate(range(exclusive_min = 0.0, max = 90.0))]
    pub max_angle_deg: f32,

    /// Rear counter-steer ratio in low-speed mode (30° front -> 25° rear)
    #[validate(range(min = 0.0, max = 1.0))]
    pub rear_counter_ratio: f32,

    /// Interpolation completion per second
    #[validate(range(exclusive_min = 0.0))]
    pub completion_rate: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_angle_deg: 30.0,
            rear_counter_ratio: 0.833,
            completion_rate: 5.0,
        }
    }
}

/// Full torque until 60% speed, tapering to 40% at top speed
pub fn default_torque_curve() -> ResponseCurve {
    ResponseCurve::new(vec![[0.0, 1.0], [0.6, 0.9], [1.0, 0.4]])
}

/// Linear taper from full to half torque at the reverse cap
pub fn default_reverse_torque_curve() -> ResponseCurve {
    ResponseCurve::linear(1.0, 0.5)
}

/// Braking bites harder with speed
pub fn default_brake_curve() -> ResponseCurve {
    ResponseCurve::linear(0.5, 0.8)
}

/// Low-speed mode below 25% speed, fully off above 35%
pub fn default_four_wheel_steering_curve() -> ResponseCurve {
    ResponseCurve::new(vec![[0.0, 1.0], [0.25, 1.0], [0.35, 0.0]])
}

/// Front tires lose a third of their grip toward top speed
pub fn default_front_grip_curve() -> ResponseCurve {
    ResponseCurve::linear(0.9, 0.6)
}

/// Rear tires stay slightly grippier than the front
pub fn default_rear_grip_curve() -> ResponseCurve {
    ResponseCurve::linear(0.95, 0.7)
}
