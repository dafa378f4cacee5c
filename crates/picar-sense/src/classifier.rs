//! 方向分类器
//!
//! 把三通道灰度读数映射为离散转向方向。分类器是一个小型 Mealy 状态机：
//! 唯一的状态是上一次输出的方向，当五条规则都不满足时原样返回它。
//!
//! # 规则（按顺序，首个匹配生效）
//!
//! 记 `a = (|e0|, |e1|)`，`s = (sign(e0), sign(e1))`，`p` 为极性符号：
//!
//! | 方向 | 条件 |
//! |---|---|
//! | Straight | `a0 ≥ h ∧ a1 ≥ h ∧ s0 = s1 = p` |
//! | SlightLeft | `a0 ≤ l ∧ a1 ≥ l ∧ s1 = p` |
//! | SharpLeft | `a0 ≥ h ∧ a1 ≤ l ∧ s0 = -p` |
//! | SlightRight | `a0 ≥ l ∧ a1 ≤ l ∧ s0 = p` |
//! | SharpRight | `a0 ≤ l ∧ a1 ≥ h ∧ s1 = -p` |
//!
//! 比较全部是闭区间。边沿值恰好落在阈值上时，多条规则可能同时成立，
//! 以表中顺序为准（例如 `a0 = a1 = l` 且 `s0 = s1 = p` 时判为 SlightLeft）。

use crate::direction::{Direction, Polarity};
use crate::error::SensorFault;
use crate::reading::{Reading, ReadingKind, SensorReading};
use tracing::trace;

/// 双阈值（滞回）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// 低阈值（轻微转向）
    pub low: f64,
    /// 高阈值（急转向）
    pub high: f64,
}

impl Thresholds {
    /// 创建阈值对（不做校验，见 [`Thresholds::is_valid`]）
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// `0 ≤ low < high`（`high` 可以是 +∞）
    pub fn is_valid(&self) -> bool {
        self.low >= 0.0 && self.low < self.high
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low: 0.35,
            high: 0.8,
        }
    }
}

/// numpy 风格的符号函数：0 映射为 0
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// 按规则表分类一次读数（纯函数）
///
/// 返回 `None` 表示五条规则都不满足（调用方应沿用上一次的方向）。
/// 对任意输入都不会 panic；NaN 边沿使所有比较为假，因此同样返回 `None`。
pub fn classify_edges(
    reading: &SensorReading,
    thresholds: Thresholds,
    polarity: Polarity,
) -> Option<Direction> {
    let [e0, e1] = reading.edges();
    let (a0, a1) = (e0.abs(), e1.abs());
    let (s0, s1) = (sign(e0), sign(e1));
    let p = polarity.sign();
    let Thresholds { low: l, high: h } = thresholds;

    if a0 >= h && a1 >= h && s0 == p && s1 == p {
        Some(Direction::Straight)
    } else if a0 <= l && a1 >= l && s1 == p {
        Some(Direction::SlightLeft)
    } else if a0 >= h && a1 <= l && s0 == -p {
        Some(Direction::SharpLeft)
    } else if a0 >= l && a1 <= l && s0 == p {
        Some(Direction::SlightRight)
    } else if a0 <= l && a1 >= h && s1 == -p {
        Some(Direction::SharpRight)
    } else {
        None
    }
}

/// 带"上一次方向"记忆的分类器
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    thresholds: Thresholds,
    polarity: Polarity,
    previous: Direction,
}

impl DirectionClassifier {
    /// 创建分类器，初始方向为 `Straight`
    pub fn new(thresholds: Thresholds, polarity: Polarity) -> Self {
        Self {
            thresholds,
            polarity,
            previous: Direction::Straight,
        }
    }

    /// 分类一次读数并更新状态
    ///
    /// 无规则匹配时返回上一次的方向，状态不变。
    pub fn classify(&mut self, reading: &SensorReading) -> Direction {
        let direction = match classify_edges(reading, self.thresholds, self.polarity) {
            Some(direction) => direction,
            None => {
                trace!(
                    "No direction rule matched for {:?}, holding {}",
                    reading.values(),
                    self.previous
                );
                self.previous
            },
        };
        self.previous = direction;
        direction
    }

    /// 上一次输出的方向
    pub fn previous(&self) -> Direction {
        self.previous
    }

    /// 阈值
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// 极性
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

/// 巡线解释器
///
/// 把巡线传感源（灰度或摄像头）的读数统一解释成方向标量：
/// - 灰度读数走 [`DirectionClassifier`]
/// - 摄像头偏移直接使用（钳位到 [-1, 1]），没找到线时沿用上一次的值
/// - 还没有任何读数时同样沿用上一次的值（初始为 0.0）
#[derive(Debug, Clone)]
pub struct LineInterpreter {
    classifier: DirectionClassifier,
    last: f64,
}

impl LineInterpreter {
    /// 创建解释器
    pub fn new(classifier: DirectionClassifier) -> Self {
        Self {
            classifier,
            last: Direction::Straight.value(),
        }
    }

    /// 解释一次读数
    ///
    /// # 错误
    /// - `SensorFault::WrongReading`: 收到测距读数
    /// - `SensorFault::NonFinite`: 摄像头偏移不是有限值
    pub fn interpret(&mut self, reading: Option<&Reading>) -> Result<f64, SensorFault> {
        match reading {
            None | Some(Reading::LineOffset(None)) => {},
            Some(Reading::Proximity(r)) => {
                self.last = self.classifier.classify(r).value();
            },
            Some(Reading::LineOffset(Some(offset))) => {
                if !offset.is_finite() {
                    return Err(SensorFault::NonFinite {
                        values: vec![*offset],
                    });
                }
                self.last = offset.clamp(-1.0, 1.0);
            },
            Some(other) => {
                return Err(SensorFault::WrongReading {
                    expected: ReadingKind::Proximity,
                    got: other.kind(),
                });
            },
        }
        Ok(self.last)
    }

    /// 上一次输出的方向标量
    pub fn last(&self) -> f64 {
        self.last
    }

    /// 内部分类器
    pub fn classifier(&self) -> &DirectionClassifier {
        &self.classifier
    }
}
