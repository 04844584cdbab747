//! Visual steering: target wheel yaw plus time-based smoothing toward it.
//!
//! Force computation reads the published wheel rotations but never writes
//! them; only [`SteeringAnimator`] does.

use contracts::{SteeringConfig, WheelRole};
use nalgebra::UnitQuaternion;

use crate::body::yaw_rotation;

/// Rear wheel behaviour when four-wheel steering is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RearSteerMode {
    /// Rear wheels opposite the front at a reduced ratio
    CounterSteer,
    /// Rear wheels match the front
    Crab,
    /// Rear wheels stay straight
    Centered,
}

#[derive(Debug, Clone, Copy)]
struct WheelYaw {
    role: WheelRole,
    start: UnitQuaternion<f32>,
    current: UnitQuaternion<f32>,
}

/// Smooths wheel yaw toward the steering target.
#[derive(Debug, Clone)]
pub struct SteeringAnimator {
    config: SteeringConfig,
    four_wheel_steering: bool,
    crab_at_high_speed: bool,
    low_speed: bool,
    input: f32,
    completion: f32,
    wheels: Vec<WheelYaw>,
}

impl SteeringAnimator {
    pub fn new(
        config: SteeringConfig,
        four_wheel_steering: bool,
        crab_at_high_speed: bool,
        roles: impl IntoIterator<Item = WheelRole>,
    ) -> Self {
        let wheels = roles
            .into_iter()
            .map(|role| WheelYaw {
                role,
                start: UnitQuaternion::identity(),
                current: UnitQuaternion::identity(),
            })
            .collect();

        Self {
            config,
            four_wheel_steering,
            crab_at_high_speed,
            low_speed: false,
            input: 0.0,
            completion: 1.0,
            wheels,
        }
    }

    /// New steering input. A changed value restarts interpolation from the
    /// current orientations.
    pub fn set_input(&mut self, input: f32) {
        if input != self.input {
            self.input = input;
            self.restart();
        }
    }

    pub fn input(&self) -> f32 {
        self.input
    }

    /// Enter or leave low-speed steering. A mode change restarts interpolation.
    pub fn set_low_speed(&mut self, low_speed: bool) {
        if low_speed != self.low_speed {
            self.low_speed = low_speed;
            self.restart();
        }
    }

    pub fn is_low_speed(&self) -> bool {
        self.low_speed
    }

    pub fn completion(&self) -> f32 {
        self.completion
    }

    pub fn rear_mode(&self) -> RearSteerMode {
        if self.low_speed {
            RearSteerMode::CounterSteer
        } else if self.crab_at_high_speed {
            RearSteerMode::Crab
        } else {
            RearSteerMode::Centered
        }
    }

    /// Target yaw (degrees) for a wheel at the current input and mode
    pub fn target_yaw(&self, role: WheelRole) -> f32 {
        let front = self.input.clamp(-1.0, 1.0) * self.config.max_angle_deg;
        if role.is_front() {
            return front;
        }
        if !self.four_wheel_steering {
            return 0.0;
        }
        match self.rear_mode() {
            RearSteerMode::CounterSteer => -front * self.config.rear_counter_ratio,
            RearSteerMode::Crab => front,
            RearSteerMode::Centered => 0.0,
        }
    }

    /// Advance interpolation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if self.completion >= 1.0 {
            return;
        }
        self.completion = (self.completion + self.config.completion_rate * dt.max(0.0)).min(1.0);

        for i in 0..self.wheels.len() {
            let wheel = self.wheels[i];
            if !wheel.role.is_front() && !self.four_wheel_steering {
                continue;
            }
            let target = yaw_rotation(self.target_yaw(wheel.role));
            self.wheels[i].current = wheel
                .start
                .try_slerp(&target, self.completion, 1e-6)
                .unwrap_or(target);
        }
    }

    /// Current local rotation of a wheel
    pub fn rotation(&self, role: WheelRole) -> UnitQuaternion<f32> {
        self.wheels
            .iter()
            .find(|wheel| wheel.role == role)
            .map(|wheel| wheel.current)
            .unwrap_or_else(UnitQuaternion::identity)
    }

    /// Current yaw of a wheel in degrees, positive right
    pub fn yaw_deg(&self, role: WheelRole) -> f32 {
        let rotation = self.rotation(role);
        -rotation.scaled_axis().y.to_degrees()
    }

    /// Straighten every wheel and restart interpolation
    pub fn reset(&mut self) {
        self.input = 0.0;
        for wheel in &mut self.wheels {
            wheel.current = UnitQuaternion::identity();
        }
        self.restart();
    }

    fn restart(&mut self) {
        for wheel in &mut self.wheels {
            wheel.start = wheel.current;
        }
        self.completion = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator(four_wheel: bool, crab: bool) -> SteeringAnimator {
        SteeringAnimator::new(SteeringConfig::default(), four_wheel, crab, WheelRole::ALL)
    }

    fn settle(animator: &mut SteeringAnimator) {
        for _ in 0..100 {
            animator.tick(0.02);
        }
    }

    #[test]
    fn test_front_angle_symmetric() {
        let mut steering = animator(false, false);
        steering.set_input(1.0);
        assert_eq!(steering.target_yaw(WheelRole::FrontLeft), 30.0);
        steering.set_input(-1.0);
        assert_eq!(steering.target_yaw(WheelRole::FrontRight), -30.0);
        assert_eq!(steering.target_yaw(WheelRole::RearLeft), 0.0);
    }

    #[test]
    fn test_interpolates_toward_target() {
        let mut steering = animator(false, false);
        steering.set_input(1.0);
        assert_eq!(steering.completion(), 0.0);

        steering.tick(0.1);
        let halfway = steering.yaw_deg(WheelRole::FrontLeft);
        assert!((halfway - 15.0).abs() < 0.1, "yaw {halfway}");

        settle(&mut steering);
        assert_eq!(steering.completion(), 1.0);
        assert!((steering.yaw_deg(WheelRole::FrontRight) - 30.0).abs() < 0.01);
        assert!(steering.yaw_deg(WheelRole::RearLeft).abs() < 1e-4);
    }

    #[test]
    fn test_new_input_restarts_from_current() {
        let mut steering = animator(false, false);
        steering.set_input(1.0);
        settle(&mut steering);

        steering.set_input(-1.0);
        assert_eq!(steering.completion(), 0.0);
        // Nothing moves before the first tick
        assert!((steering.yaw_deg(WheelRole::FrontLeft) - 30.0).abs() < 0.01);

        steering.tick(0.1);
        assert!(steering.yaw_deg(WheelRole::FrontLeft).abs() < 0.1);
    }

    #[test]
    fn test_low_speed_counter_steer() {
        let mut steering = animator(true, true);
        steering.set_low_speed(true);
        steering.set_input(1.0);
        settle(&mut steering);

        assert_eq!(steering.rear_mode(), RearSteerMode::CounterSteer);
        assert!((steering.yaw_deg(WheelRole::RearRight) + 24.99).abs() < 0.01);
    }

    #[test]
    fn test_mode_switch_resets_completion() {
        let mut steering = animator(true, true);
        steering.set_input(1.0);
        settle(&mut steering);
        assert_eq!(steering.rear_mode(), RearSteerMode::Crab);
        assert!((steering.yaw_deg(WheelRole::RearLeft) - 30.0).abs() < 0.01);

        steering.set_low_speed(true);
        assert_eq!(steering.completion(), 0.0);
        settle(&mut steering);
        assert!(steering.yaw_deg(WheelRole::RearLeft) < -24.0);
    }

    #[test]
    fn test_centered_rear_without_crab() {
        let mut steering = animator(true, false);
        steering.set_input(-1.0);
        settle(&mut steering);
        assert_eq!(steering.rear_mode(), RearSteerMode::Centered);
        assert!(steering.yaw_deg(WheelRole::RearLeft).abs() < 1e-4);
    }

    #[test]
    fn test_reset_straightens() {
        let mut steering = animator(false, false);
        steering.set_input(1.0);
        settle(&mut steering);

        steering.reset();
        assert_eq!(steering.input(), 0.0);
        assert_eq!(steering.completion(), 0.0);
        assert!(steering.yaw_deg(WheelRole::FrontLeft).abs() < 1e-4);
    }
}
