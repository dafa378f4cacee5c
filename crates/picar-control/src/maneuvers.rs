//! 预设机动动作
//!
//! 多步动作由若干定时步骤组成，每步开始前和保持期间都检查终止信号，
//! 无论完成、取消还是失败，最后都会发出停车指令。

use crate::actuator::Actuator;
use crate::error::ActuatorFault;
use picar_bus::TerminationSignal;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 转向侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// 向左
    Left,
    /// 向右
    Right,
}

impl Side {
    /// 转向角符号（左为负）
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// 机动参数
///
/// 动作使用固定的安全速度与角度，不跟随巡线参数。
#[derive(Debug, Clone, PartialEq)]
pub struct ManeuverConfig {
    /// 行驶速度（取绝对值，方向由步骤决定）
    pub speed: f64,
    /// 转向角（度，取绝对值）
    pub angle: f64,
    /// 单步时长
    pub step: Duration,
    /// 保持期间检查终止信号的间隔
    pub poll: Duration,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        Self {
            speed: 30.0,
            angle: 30.0,
            step: Duration::from_secs(1),
            poll: Duration::from_millis(10),
        }
    }
}

/// 单个定时步骤
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverStep {
    /// 速度（负值倒车）
    pub speed: f64,
    /// 转向角（度）
    pub angle: f64,
    /// 保持时长
    pub duration: Duration,
}

/// 动作结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverOutcome {
    /// 所有步骤完成
    Completed,
    /// 被终止信号打断
    Cancelled {
        /// 已完成的步骤数
        completed_steps: usize,
    },
}

/// 以 `speed` 前进，转向角 `angle`
pub fn forward_with_angle<A: Actuator + ?Sized>(
    actuator: &mut A,
    speed: f64,
    angle: f64,
) -> Result<(), ActuatorFault> {
    actuator.drive(speed.abs(), angle)
}

/// 以 `speed` 倒车，转向角 `angle`
pub fn backward_with_angle<A: Actuator + ?Sized>(
    actuator: &mut A,
    speed: f64,
    angle: f64,
) -> Result<(), ActuatorFault> {
    actuator.drive(-speed.abs(), angle)
}

/// 侧方停车的步骤：向停车侧打角倒车，反打回正，前进摆正
pub fn parallel_park_steps(side: Side, config: &ManeuverConfig) -> Vec<ManeuverStep> {
    let speed = config.speed.abs();
    let angle = side.sign() * config.angle.abs();
    vec![
        ManeuverStep {
            speed: -speed,
            angle,
            duration: config.step,
        },
        ManeuverStep {
            speed: -speed,
            angle: -angle,
            duration: config.step,
        },
        ManeuverStep {
            speed,
            angle: 0.0,
            duration: config.step / 2,
        },
    ]
}

/// 三点掉头的步骤：打角前进，反打倒车，再打角前进
pub fn three_point_turn_steps(side: Side, config: &ManeuverConfig) -> Vec<ManeuverStep> {
    let speed = config.speed.abs();
    let angle = side.sign() * config.angle.abs();
    vec![
        ManeuverStep {
            speed,
            angle,
            duration: config.step,
        },
        ManeuverStep {
            speed: -speed,
            angle: -angle,
            duration: config.step,
        },
        ManeuverStep {
            speed,
            angle,
            duration: config.step,
        },
    ]
}

/// 侧方停车
pub fn parallel_park<A: Actuator + ?Sized>(
    actuator: &mut A,
    side: Side,
    config: &ManeuverConfig,
    signal: &TerminationSignal,
) -> Result<ManeuverOutcome, ActuatorFault> {
    info!("Parallel park ({:?})", side);
    run_steps(actuator, &parallel_park_steps(side, config), config.poll, signal)
}

/// 三点掉头
pub fn three_point_turn<A: Actuator + ?Sized>(
    actuator: &mut A,
    side: Side,
    config: &ManeuverConfig,
    signal: &TerminationSignal,
) -> Result<ManeuverOutcome, ActuatorFault> {
    info!("Three point turn ({:?})", side);
    run_steps(actuator, &three_point_turn_steps(side, config), config.poll, signal)
}

/// 依次执行步骤，最后停车
pub fn run_steps<A: Actuator + ?Sized>(
    actuator: &mut A,
    steps: &[ManeuverStep],
    poll: Duration,
    signal: &TerminationSignal,
) -> Result<ManeuverOutcome, ActuatorFault> {
    for (index, step) in steps.iter().enumerate() {
        if signal.is_triggered() {
            return cancel(actuator, index);
        }
        if let Err(fault) = actuator.drive(step.speed, step.angle) {
            if let Err(e) = actuator.stop() {
                warn!("Best-effort stop after maneuver fault failed: {}", e);
            }
            return Err(fault);
        }
        if !hold(step.duration, poll, signal) {
            return cancel(actuator, index);
        }
    }
    actuator.stop()?;
    Ok(ManeuverOutcome::Completed)
}

fn cancel<A: Actuator + ?Sized>(
    actuator: &mut A,
    completed_steps: usize,
) -> Result<ManeuverOutcome, ActuatorFault> {
    info!("Maneuver cancelled after {} steps", completed_steps);
    actuator.stop()?;
    Ok(ManeuverOutcome::Cancelled { completed_steps })
}

/// 保持 `duration`；被终止时返回 `false`
fn hold(duration: Duration, poll: Duration, signal: &TerminationSignal) -> bool {
    let started = Instant::now();
    loop {
        if signal.is_triggered() {
            return false;
        }
        let elapsed = started.elapsed();
        if elapsed >= duration {
            return true;
        }
        let remaining = duration - elapsed;
        let nap = if poll.is_zero() { remaining } else { poll.min(remaining) };
        spin_sleep::sleep(nap);
    }
}
