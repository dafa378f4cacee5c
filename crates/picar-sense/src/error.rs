//! 感知层错误类型定义

use crate::reading::ReadingKind;
use thiserror::Error;

/// 传感器故障
///
/// 单个周期内的读取失败。Stage 边界会捕获并记录此错误，
/// 本周期不发布新值（邮箱保留上一次的值）。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorFault {
    /// 传感器设备读取失败
    #[error("Sensor device error: {0}")]
    Device(String),

    /// 读数（或归一化结果）不是有限值
    #[error("Non-finite sensor values: {values:?}")]
    NonFinite {
        /// 出问题的读数
        values: Vec<f64>,
    },

    /// 读数类型与解释器不匹配（例如把测距读数送进巡线解释器）
    #[error("Unexpected reading: expected {expected}, got {got}")]
    WrongReading {
        /// 期望的读数类型
        expected: ReadingKind,
        /// 实际收到的读数类型
        got: ReadingKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_fault_display() {
        let msg = SensorFault::Device("ADC A1 timeout".to_string()).to_string();
        assert!(msg.contains("Sensor device error") && msg.contains("ADC A1"));

        let msg = SensorFault::NonFinite {
            values: vec![f64::NAN, 1.0, 2.0],
        }
        .to_string();
        assert!(msg.contains("Non-finite"));

        let msg = SensorFault::WrongReading {
            expected: ReadingKind::Proximity,
            got: ReadingKind::Distance,
        }
        .to_string();
        assert_eq!(msg, "Unexpected reading: expected proximity, got distance");
    }
}
