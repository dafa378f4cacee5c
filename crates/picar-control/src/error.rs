//! 控制层错误类型定义

use thiserror::Error;

/// 执行器故障
///
/// 与传感器故障不同，执行器故障会上报给宿主：车辆状态未知时不能静默继续。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActuatorFault {
    /// 电机 / 舵机驱动返回错误
    #[error("Actuator device error: {0}")]
    Device(String),

    /// 执行器连接断开
    #[error("Actuator disconnected")]
    Disconnected,
}
