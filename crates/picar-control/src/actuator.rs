//! 执行器接口
//!
//! 管线只依赖这个窄接口：`drive(speed, angle)` 与 `stop()`。
//! 具体车辆（舵机 + 电机）由 [`Robot`](crate::Robot) 组合实现，测试使用
//! [`SimulatedCar`](crate::sim::SimulatedCar)。

use crate::error::ActuatorFault;
use std::fmt;

/// 执行器（运动指令的接收方）
pub trait Actuator: Send {
    /// 以 `speed` 行驶，转向角 `angle`（度，负值向左）
    ///
    /// `speed` 为负表示倒车。
    fn drive(&mut self, speed: f64, angle: f64) -> Result<(), ActuatorFault>;

    /// 停车
    ///
    /// 必须可以重复调用。
    fn stop(&mut self) -> Result<(), ActuatorFault>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn drive(&mut self, speed: f64, angle: f64) -> Result<(), ActuatorFault> {
        (**self).drive(speed, angle)
    }

    fn stop(&mut self) -> Result<(), ActuatorFault> {
        (**self).stop()
    }
}

/// 发给执行器的一条指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// 行驶
    Drive {
        /// 速度（负值倒车）
        speed: f64,
        /// 转向角（度）
        angle: f64,
    },
    /// 停车
    Stop,
}

impl DriveCommand {
    /// 是否为停车指令
    pub fn is_stop(&self) -> bool {
        matches!(self, DriveCommand::Stop)
    }

    /// 把指令发给执行器
    pub fn send_to<A: Actuator + ?Sized>(&self, actuator: &mut A) -> Result<(), ActuatorFault> {
        match *self {
            DriveCommand::Drive { speed, angle } => actuator.drive(speed, angle),
            DriveCommand::Stop => actuator.stop(),
        }
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveCommand::Drive { speed, angle } => {
                write!(f, "drive(speed={speed:.1}, angle={angle:.1}°)")
            },
            DriveCommand::Stop => f.write_str("stop"),
        }
    }
}
