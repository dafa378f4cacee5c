//! 车辆组合
//!
//! 把转向舵机与驱动电机组合成一个 [`Actuator`]。
//! 组合层负责限幅：任何来源的转向角都不会超过 `±max_steering_angle`。

use crate::actuator::Actuator;
use crate::error::ActuatorFault;
use tracing::{trace, warn};

/// 默认最大转向角（度）
pub const DEFAULT_MAX_STEERING_ANGLE: f64 = 30.0;

/// 转向能力
pub trait Steering: Send {
    /// 设置转向角（度，负值向左）
    fn set_steering_angle(&mut self, degrees: f64) -> Result<(), ActuatorFault>;
}

/// 驱动能力
pub trait Throttle: Send {
    /// 设置速度（负值倒车，0 停车）
    fn set_speed(&mut self, speed: f64) -> Result<(), ActuatorFault>;
}

/// 舵机 + 电机组成的车辆
#[derive(Debug)]
pub struct Robot<S, T> {
    steering: S,
    throttle: T,
    max_steering_angle: f64,
}

impl<S: Steering, T: Throttle> Robot<S, T> {
    /// 以默认最大转向角组合车辆
    pub fn new(steering: S, throttle: T) -> Self {
        Self {
            steering,
            throttle,
            max_steering_angle: DEFAULT_MAX_STEERING_ANGLE,
        }
    }

    /// 设置最大转向角（取绝对值）
    pub fn with_max_steering_angle(mut self, degrees: f64) -> Self {
        self.max_steering_angle = degrees.abs();
        self
    }

    /// 最大转向角
    pub fn max_steering_angle(&self) -> f64 {
        self.max_steering_angle
    }

    /// 限幅后的转向角
    ///
    /// 非有限值按直行处理。
    pub fn clamp_angle(&self, degrees: f64) -> f64 {
        if !degrees.is_finite() {
            warn!("Ignoring non-finite steering angle {}, steering straight", degrees);
            return 0.0;
        }
        degrees.clamp(-self.max_steering_angle, self.max_steering_angle)
    }

    /// 设置转向角（限幅），返回实际下发的角度
    pub fn set_steering_angle(&mut self, degrees: f64) -> Result<f64, ActuatorFault> {
        let applied = self.clamp_angle(degrees);
        self.steering.set_steering_angle(applied)?;
        Ok(applied)
    }

    /// 先转向再驱动，返回实际下发的角度
    pub fn drive_steer(&mut self, speed: f64, degrees: f64) -> Result<f64, ActuatorFault> {
        let applied = self.set_steering_angle(degrees)?;
        self.throttle.set_speed(speed)?;
        trace!("speed {} angle {}", speed, applied);
        Ok(applied)
    }

    /// 取回部件
    pub fn into_parts(self) -> (S, T) {
        (self.steering, self.throttle)
    }
}

impl<S: Steering, T: Throttle> Actuator for Robot<S, T> {
    fn drive(&mut self, speed: f64, angle: f64) -> Result<(), ActuatorFault> {
        self.drive_steer(speed, angle).map(|_| ())
    }

    fn stop(&mut self) -> Result<(), ActuatorFault> {
        self.throttle.set_speed(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Servo {
        angles: Vec<f64>,
    }

    impl Steering for Servo {
        fn set_steering_angle(&mut self, degrees: f64) -> Result<(), ActuatorFault> {
            self.angles.push(degrees);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Motor {
        speeds: Vec<f64>,
        offline: bool,
    }

    impl Throttle for Motor {
        fn set_speed(&mut self, speed: f64) -> Result<(), ActuatorFault> {
            if self.offline {
                return Err(ActuatorFault::Disconnected);
            }
            self.speeds.push(speed);
            Ok(())
        }
    }

    #[test]
    fn test_angle_is_clamped() {
        let mut robot = Robot::new(Servo::default(), Motor::default());
        assert_eq!(robot.drive_steer(22.0, 45.0).unwrap(), 30.0);
        assert_eq!(robot.drive_steer(22.0, -90.0).unwrap(), -30.0);
        assert_eq!(robot.drive_steer(22.0, 12.5).unwrap(), 12.5);

        let (servo, motor) = robot.into_parts();
        assert_eq!(servo.angles, vec![30.0, -30.0, 12.5]);
        assert_eq!(motor.speeds, vec![22.0, 22.0, 22.0]);
    }

    #[test]
    fn test_custom_limit_and_non_finite() {
        let robot = Robot::new(Servo::default(), Motor::default()).with_max_steering_angle(-20.0);
        assert_eq!(robot.max_steering_angle(), 20.0);
        assert_eq!(robot.clamp_angle(25.0), 20.0);
        assert_eq!(robot.clamp_angle(f64::NAN), 0.0);
        assert_eq!(robot.clamp_angle(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_stop_zeroes_throttle_only() {
        let mut robot = Robot::new(Servo::default(), Motor::default());
        robot.drive(22.0, 10.0).unwrap();
        robot.stop().unwrap();
        robot.stop().unwrap();
        let (servo, motor) = robot.into_parts();
        assert_eq!(servo.angles, vec![10.0]);
        assert_eq!(motor.speeds, vec![22.0, 0.0, 0.0]);
    }

    #[test]
    fn test_throttle_fault_propagates() {
        let motor = Motor {
            offline: true,
            ..Default::default()
        };
        let mut robot = Robot::new(Servo::default(), motor);
        assert_eq!(robot.drive(22.0, 0.0), Err(ActuatorFault::Disconnected));
        assert_eq!(robot.stop(), Err(ActuatorFault::Disconnected));
    }
}
