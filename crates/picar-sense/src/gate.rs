//! 障碍物判定
//!
//! 超声波模块没有回波时返回非正值（通常是 -1），这个哨兵值必须判为"无障碍"，
//! 否则小车会在空旷场地上一直停着。

use crate::error::SensorFault;
use crate::reading::{Reading, ReadingKind};

/// `0 < distance ≤ threshold` 时判为障碍物
///
/// 纯函数，对任意输入都有定义：非正距离（无回波）和 NaN 都返回 `false`。
#[inline]
pub fn is_obstacle(distance: f64, threshold: f64) -> bool {
    distance > 0.0 && distance <= threshold
}

/// 障碍物判定器（固定阈值）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleGate {
    threshold: f64,
}

impl ObstacleGate {
    /// 创建判定器，阈值单位与测距模块一致（cm）
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// 阈值
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 判定一个距离
    pub fn check(&self, distance: f64) -> bool {
        is_obstacle(distance, self.threshold)
    }

    /// 解释一次读数；还没有读数时视为无障碍
    ///
    /// # 错误
    /// - `SensorFault::WrongReading`: 收到的不是测距读数
    pub fn interpret(&self, reading: Option<&Reading>) -> Result<bool, SensorFault> {
        match reading {
            None => Ok(false),
            Some(Reading::Distance(d)) => Ok(self.check(*d)),
            Some(other) => Err(SensorFault::WrongReading {
                expected: ReadingKind::Distance,
                got: other.kind(),
            }),
        }
    }
}
