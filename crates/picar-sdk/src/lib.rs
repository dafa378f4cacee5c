//! # picar-sdk - PiCar-X 巡线管线
//!
//! 把独立时钟的传感器读数变成一条执行指令：
//!
//! - **总线层** (`picar_bus`): 单槽邮箱、阶段、调度器、终止信号
//! - **感知层** (`picar_sense`): 读数归一化、方向分类、障碍物判定、传感源
//! - **控制层** (`picar_control`): 转向控制、执行分发、车辆组合、机动动作
//! - **管线层** (本 crate): 配置、并发管线装配、同步巡线器、日志初始化
//!
//! # 快速开始
//!
//! ```rust
//! use picar_sdk::prelude::*;
//! use picar_sdk::sim::{ScriptedGrayscale, ScriptedRangefinder, SimulatedCar};
//!
//! # fn main() -> Result<(), PipelineError> {
//! let config = PipelineConfig::default()
//!     .with_uniform_delay(0.005)
//!     .with_terminate_after(0.05);
//!
//! let report = LineFollowPipeline::builder(config)
//!     .grayscale(ScriptedGrayscale::new(vec![[40.0, 10.0, 40.0]]))
//!     .obstacle_source(SensorSource::ultrasonic(ScriptedRangefinder::new(vec![80.0])))
//!     .actuator(SimulatedCar::new())
//!     .build()?
//!     .run()?;
//!
//! assert!(report.stopped);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod follower;
pub mod logging;
pub mod pipeline;

// Prelude 模块
pub mod prelude;

pub use config::{ConfigError, PipelineConfig, StageDelays};
pub use error::PipelineError;
pub use follower::{FollowStep, LineFollower};
pub use logging::init_logging;
pub use pipeline::{LineFollowPipeline, LineFollowPipelineBuilder, PipelineBuses, PipelineReport};

// 下层 crate 通过模块路径访问
pub use picar_bus as bus;
pub use picar_control as control;
pub use picar_sense as sense;

/// 模拟协作方（测试 / 演示）
pub mod sim {
    pub use picar_control::sim::{SimHandle, SimulatedCar};
    pub use picar_sense::sim::{ScriptHandle, ScriptedCamera, ScriptedGrayscale, ScriptedRangefinder};
}
