//! 模拟车辆
//!
//! 记录收到的每条指令，可注入故障。用于测试与无硬件演示。
//! 句柄与车辆共享状态，车辆移交给执行阶段后仍可在外部检查和注入。

use crate::actuator::{Actuator, DriveCommand};
use crate::error::ActuatorFault;
use crate::robot::{Steering, Throttle};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct CarState {
    commands: Vec<DriveCommand>,
    drive_fault: Option<ActuatorFault>,
    stop_fault: Option<ActuatorFault>,
    steering_angle: f64,
    speed: f64,
}

/// 模拟车辆的外部句柄
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<CarState>>,
}

impl SimHandle {
    /// 已成功执行的指令（按时间顺序）
    pub fn commands(&self) -> Vec<DriveCommand> {
        self.state.lock().commands.clone()
    }

    /// 最近一条成功执行的指令
    pub fn last(&self) -> Option<DriveCommand> {
        self.state.lock().commands.last().copied()
    }

    /// 成功执行的停车次数
    pub fn stop_count(&self) -> usize {
        self.state.lock().commands.iter().filter(|c| c.is_stop()).count()
    }

    /// 当前舵机角度（度）
    pub fn steering_angle(&self) -> f64 {
        self.state.lock().steering_angle
    }

    /// 当前速度
    pub fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    /// 之后的行驶指令都返回 `fault`，直到 [`clear_faults`](Self::clear_faults)
    pub fn fail_drive(&self, fault: ActuatorFault) {
        self.state.lock().drive_fault = Some(fault);
    }

    /// 之后的停车指令都返回 `fault`
    pub fn fail_stop(&self, fault: ActuatorFault) {
        self.state.lock().stop_fault = Some(fault);
    }

    /// 模拟断线：行驶与停车都失败
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.drive_fault = Some(ActuatorFault::Disconnected);
        state.stop_fault = Some(ActuatorFault::Disconnected);
    }

    /// 清除注入的故障
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.drive_fault = None;
        state.stop_fault = None;
    }
}

/// 模拟车辆
///
/// 同时实现 [`Actuator`] 和 [`Steering`] / [`Throttle`]，
/// 既可以直接交给执行分发，也可以作为 [`Robot`](crate::Robot) 的部件。
#[derive(Debug, Clone)]
pub struct SimulatedCar {
    handle: SimHandle,
}

impl SimulatedCar {
    /// 创建静止、无故障的模拟车辆
    pub fn new() -> Self {
        Self {
            handle: SimHandle {
                state: Arc::new(Mutex::new(CarState::default())),
            },
        }
    }

    /// 外部句柄
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl Default for SimulatedCar {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimulatedCar {
    fn drive(&mut self, speed: f64, angle: f64) -> Result<(), ActuatorFault> {
        let mut state = self.handle.state.lock();
        if let Some(fault) = &state.drive_fault {
            return Err(fault.clone());
        }
        state.steering_angle = angle;
        state.speed = speed;
        state.commands.push(DriveCommand::Drive { speed, angle });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorFault> {
        let mut state = self.handle.state.lock();
        if let Some(fault) = &state.stop_fault {
            return Err(fault.clone());
        }
        state.speed = 0.0;
        state.commands.push(DriveCommand::Stop);
        Ok(())
    }
}

impl Steering for SimulatedCar {
    fn set_steering_angle(&mut self, degrees: f64) -> Result<(), ActuatorFault> {
        let mut state = self.handle.state.lock();
        if let Some(fault) = &state.drive_fault {
            return Err(fault.clone());
        }
        state.steering_angle = degrees;
        Ok(())
    }
}

impl Throttle for SimulatedCar {
    fn set_speed(&mut self, speed: f64) -> Result<(), ActuatorFault> {
        let mut state = self.handle.state.lock();
        let fault = if speed == 0.0 {
            &state.stop_fault
        } else {
            &state.drive_fault
        };
        if let Some(fault) = fault {
            return Err(fault.clone());
        }
        state.speed = speed;
        Ok(())
    }
}
