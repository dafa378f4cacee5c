//! 传感器读数与归一化
//!
//! 灰度模块的三路 ADC 原始值受环境光影响很大，进入分类器之前先做归一化：
//! - `Mean`：除以均值（默认）
//! - `ZScore`：减均值再除以标准差
//!
//! 两种模式的分母都加上 [`NORMALIZE_EPSILON`]，保证全零读数也能得到有限结果。

use crate::error::SensorFault;
use std::fmt;

/// 归一化分母的保护值
pub const NORMALIZE_EPSILON: f64 = 1e-9;

/// 三通道归一化读数（左、中、右）
///
/// 每个感知周期产生一份，发布后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReading(pub [f64; 3]);

impl SensorReading {
    /// 直接由三个（已归一化的）值构造
    pub const fn new(left: f64, center: f64, right: f64) -> Self {
        Self([left, center, right])
    }

    /// 读数数组
    pub fn values(&self) -> [f64; 3] {
        self.0
    }

    /// 是否三个值都是有限值
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// 以中间传感器为参照的两条边沿值
    ///
    /// `e0 = r1 - r0`，`e1 = -(r2 - r1)`。
    pub fn edges(&self) -> [f64; 2] {
        let [r0, r1, r2] = self.0;
        [r1 - r0, -(r2 - r1)]
    }
}

impl From<[f64; 3]> for SensorReading {
    fn from(values: [f64; 3]) -> Self {
        Self(values)
    }
}

/// 归一化模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Normalization {
    /// 除以均值
    #[default]
    Mean,
    /// 标准分数（总体标准差）
    ZScore,
}

/// 归一化三路原始读数
///
/// # 错误
/// - `SensorFault::NonFinite`: 原始值或归一化结果含 NaN / 无穷
pub fn normalize(raw: [f64; 3], mode: Normalization) -> Result<SensorReading, SensorFault> {
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(SensorFault::NonFinite {
            values: raw.to_vec(),
        });
    }

    let mean = raw.iter().sum::<f64>() / 3.0;
    let normalized = match mode {
        Normalization::Mean => raw.map(|v| v / (mean + NORMALIZE_EPSILON)),
        Normalization::ZScore => {
            let variance = raw.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            let std = variance.sqrt();
            raw.map(|v| (v - mean) / (std + NORMALIZE_EPSILON))
        },
    };

    let reading = SensorReading(normalized);
    if !reading.is_finite() {
        return Err(SensorFault::NonFinite {
            values: normalized.to_vec(),
        });
    }
    Ok(reading)
}

/// 读数类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingKind {
    /// 灰度三通道
    Proximity,
    /// 摄像头线偏移
    LineOffset,
    /// 超声波距离
    Distance,
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadingKind::Proximity => "proximity",
            ReadingKind::LineOffset => "line offset",
            ReadingKind::Distance => "distance",
        };
        f.write_str(name)
    }
}

/// 任意传感源产生的一次读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// 灰度模块：三通道归一化读数
    Proximity(SensorReading),
    /// 摄像头：线相对画面中心的偏移，范围 [-1, 1]；`None` 表示本帧没有找到线
    LineOffset(Option<f64>),
    /// 超声波：距离（cm），非正值表示没有回波
    Distance(f64),
}

impl Reading {
    /// 读数类型
    pub fn kind(&self) -> ReadingKind {
        match self {
            Reading::Proximity(_) => ReadingKind::Proximity,
            Reading::LineOffset(_) => ReadingKind::LineOffset,
            Reading::Distance(_) => ReadingKind::Distance,
        }
    }

    /// 取出距离值（仅 `Distance`）
    pub fn as_distance(&self) -> Option<f64> {
        match self {
            Reading::Distance(d) => Some(*d),
            _ => None,
        }
    }
}
