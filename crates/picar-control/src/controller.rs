//! 转向控制器
//!
//! 比例映射：`angle = direction × scale`。方向标量取值 `[-1, 1]`，负值向左。

use picar_sense::Direction;

/// 默认比例（度 / 单位方向）
pub const DEFAULT_SCALE: f64 = 30.0;

/// 比例转向控制器（无状态）
///
/// # Example
///
/// ```
/// use picar_control::SteeringController;
/// use picar_sense::Direction;
///
/// let controller = SteeringController::new(30.0);
/// assert_eq!(controller.angle(Some(-0.5)), -15.0);
/// assert_eq!(controller.angle(None), 0.0);
/// assert_eq!(controller.angle_for(Some(Direction::SharpRight)), 30.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringController {
    scale: f64,
}

impl SteeringController {
    /// 创建控制器
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// 比例系数
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// 方向标量 → 转向角（度）
    ///
    /// 方向邮箱尚未写入（`None`）时输出 0.0，即直行。
    pub fn angle(&self, direction: Option<f64>) -> f64 {
        direction.map_or(0.0, |d| d * self.scale)
    }

    /// 离散方向 → 转向角（度）
    pub fn angle_for(&self, direction: Option<Direction>) -> f64 {
        self.angle(direction.map(f64::from))
    }
}

impl Default for SteeringController {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}
