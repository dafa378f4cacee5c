//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use picar_sdk::prelude::*;
//! ```

// 管线层
pub use crate::config::{ConfigError, PipelineConfig, StageDelays};
pub use crate::error::PipelineError;
pub use crate::follower::{FollowStep, LineFollower};
pub use crate::pipeline::{LineFollowPipeline, PipelineReport};

// 总线层
pub use picar_bus::{Mailbox, TerminationSignal};

// 感知层
pub use picar_sense::{Direction, Normalization, Polarity, Reading, SensorFault, SensorSource};

// 控制层
pub use picar_control::{
    ActuationDispatch, Actuator, ActuatorFault, DriveCommand, Robot, Side, SteeringController,
};
