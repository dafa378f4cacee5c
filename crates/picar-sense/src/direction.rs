//! 离散转向方向与线极性

use std::fmt;

/// 离散转向意图
///
/// 控制器把它当作标量乘数使用（见 [`Direction::value`]）。
/// 分类器无法判断时不会产生额外的 "Unknown" 值，而是沿用上一次的方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// 直行（0.0）
    #[default]
    Straight,
    /// 轻微左转（-0.5）
    SlightLeft,
    /// 急左转（-1.0）
    SharpLeft,
    /// 轻微右转（0.5）
    SlightRight,
    /// 急右转（1.0）
    SharpRight,
}

impl Direction {
    /// 所有方向
    pub const ALL: [Direction; 5] = [
        Direction::Straight,
        Direction::SlightLeft,
        Direction::SharpLeft,
        Direction::SlightRight,
        Direction::SharpRight,
    ];

    /// 标量值，左负右正
    pub const fn value(self) -> f64 {
        match self {
            Direction::Straight => 0.0,
            Direction::SlightLeft => -0.5,
            Direction::SharpLeft => -1.0,
            Direction::SlightRight => 0.5,
            Direction::SharpRight => 1.0,
        }
    }

    /// 从标量值精确还原（非枚举值返回 `None`）
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.value() == value)
    }
}

impl From<Direction> for f64 {
    fn from(direction: Direction) -> Self {
        direction.value()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Straight => "straight",
            Direction::SlightLeft => "slight-left",
            Direction::SharpLeft => "sharp-left",
            Direction::SlightRight => "slight-right",
            Direction::SharpRight => "sharp-right",
        };
        f.write_str(name)
    }
}

/// 线极性
///
/// 区分"白底黑线"与"黑底白线"。数值上就是边沿符号的期望值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i8", into = "i8"))]
pub enum Polarity {
    /// 白底黑线（-1）
    #[default]
    DarkLine,
    /// 黑底白线（+1）
    LightLine,
}

impl Polarity {
    /// 符号值：-1.0 或 +1.0
    pub const fn sign(self) -> f64 {
        match self {
            Polarity::DarkLine => -1.0,
            Polarity::LightLine => 1.0,
        }
    }
}

/// 非法极性值
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid polarity {0} (must be -1 or 1)")]
pub struct InvalidPolarity(pub i8);

impl TryFrom<i8> for Polarity {
    type Error = InvalidPolarity;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Polarity::DarkLine),
            1 => Ok(Polarity::LightLine),
            other => Err(InvalidPolarity(other)),
        }
    }
}

impl From<Polarity> for i8 {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::DarkLine => -1,
            Polarity::LightLine => 1,
        }
    }
}
