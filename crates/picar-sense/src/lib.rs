//! # picar-sense - 感知与解释层
//!
//! 把独立时钟的噪声传感器读数变成离散的转向意图和障碍物标志。
//!
//! ## 包含模块
//!
//! - `reading` - 读数类型与归一化（纯函数）
//! - `direction` - 离散方向与线极性
//! - `classifier` - 双阈值方向分类器（带上一次方向记忆）
//! - `gate` - 障碍物判定（纯函数）
//! - `source` - 传感器协作方接口与带标签的传感源
//! - `sim` - 脚本化模拟传感器（测试 / 演示）
//!
//! 本 crate 不做任何硬件访问和图像处理。

pub mod classifier;
pub mod direction;
mod error;
pub mod gate;
pub mod reading;
pub mod sim;
pub mod source;

pub use classifier::{DirectionClassifier, LineInterpreter, Thresholds, classify_edges};
pub use direction::{Direction, InvalidPolarity, Polarity};
pub use error::SensorFault;
pub use gate::{ObstacleGate, is_obstacle};
pub use reading::{Normalization, Reading, ReadingKind, SensorReading, normalize};
pub use source::{GrayscaleAdc, LineCamera, Rangefinder, SensorSource, SourceKind};
