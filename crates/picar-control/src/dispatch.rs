//! 执行分发
//!
//! 合并转向角与障碍物标志，决定本周期发给执行器的指令：
//! 有障碍物时无条件停车，否则以固定速度按转向角行驶。

use crate::actuator::{Actuator, DriveCommand};
use crate::error::ActuatorFault;
use tracing::{debug, error, info, warn};

/// 默认行驶速度
pub const DEFAULT_SPEED: f64 = 22.0;

/// 执行分发器
///
/// # Example
///
/// ```
/// use picar_control::{ActuationDispatch, DriveCommand, sim::SimulatedCar};
///
/// let mut dispatch = ActuationDispatch::new(SimulatedCar::new(), 22.0);
/// assert_eq!(
///     dispatch.apply(15.0, false).unwrap(),
///     DriveCommand::Drive { speed: 22.0, angle: 15.0 }
/// );
/// assert_eq!(dispatch.apply(15.0, true).unwrap(), DriveCommand::Stop);
/// ```
#[derive(Debug)]
pub struct ActuationDispatch<A> {
    actuator: A,
    speed: f64,
    last: Option<DriveCommand>,
}

impl<A: Actuator> ActuationDispatch<A> {
    /// 创建分发器
    pub fn new(actuator: A, speed: f64) -> Self {
        Self {
            actuator,
            speed,
            last: None,
        }
    }

    /// 行驶速度
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// 上一次成功发出的指令
    pub fn last_command(&self) -> Option<DriveCommand> {
        self.last
    }

    /// 根据转向角与障碍物标志发出一条指令
    ///
    /// 执行器失败时会尽力停车一次，然后返回原始故障。
    pub fn apply(&mut self, angle: f64, obstacle: bool) -> Result<DriveCommand, ActuatorFault> {
        let command = if obstacle {
            DriveCommand::Stop
        } else {
            DriveCommand::Drive {
                speed: self.speed,
                angle,
            }
        };

        if let Err(fault) = command.send_to(&mut self.actuator) {
            error!("Actuator rejected {}: {}", command, fault);
            self.emergency_stop();
            return Err(fault);
        }

        match (self.last, obstacle) {
            (Some(DriveCommand::Stop), false) => info!("Path clear, resuming"),
            (Some(DriveCommand::Drive { .. }) | None, true) => info!("Obstacle detected, stopping"),
            _ => {},
        }
        debug!("{}", command);
        self.last = Some(command);
        Ok(command)
    }

    /// 以邮箱读数调用 [`apply`](Self::apply)
    ///
    /// 尚未写入的转向角按 0.0 处理，尚未写入的障碍物标志按 `false` 处理。
    pub fn apply_latest(
        &mut self,
        angle: Option<f64>,
        obstacle: Option<bool>,
    ) -> Result<DriveCommand, ActuatorFault> {
        self.apply(angle.unwrap_or(0.0), obstacle.unwrap_or(false))
    }

    /// 停车（可重复调用）
    pub fn stop(&mut self) -> Result<(), ActuatorFault> {
        self.actuator.stop()?;
        self.last = Some(DriveCommand::Stop);
        Ok(())
    }

    fn emergency_stop(&mut self) {
        match self.actuator.stop() {
            Ok(()) => self.last = Some(DriveCommand::Stop),
            Err(e) => warn!("Best-effort stop also failed: {}", e),
        }
    }

    /// 执行器引用
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// 执行器可变引用
    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    /// 取回执行器
    pub fn into_inner(self) -> A {
        self.actuator
    }
}
