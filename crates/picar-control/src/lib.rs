//! # picar-control - 控制与执行层
//!
//! 把方向标量变成转向角，再与障碍物标志合并成发给车辆的指令。
//!
//! ## 包含模块
//!
//! - `controller` - 比例转向控制器
//! - `actuator` - 执行器接口与指令类型
//! - `dispatch` - 执行分发（障碍物优先停车）
//! - `robot` - 舵机 + 电机组合，转向限幅
//! - `maneuvers` - 侧方停车、三点掉头等预设动作
//! - `sim` - 记录指令、可注入故障的模拟车辆

pub mod actuator;
pub mod controller;
pub mod dispatch;
mod error;
pub mod maneuvers;
pub mod robot;
pub mod sim;

pub use actuator::{Actuator, DriveCommand};
pub use controller::SteeringController;
pub use dispatch::ActuationDispatch;
pub use error::ActuatorFault;
pub use maneuvers::{ManeuverConfig, ManeuverOutcome, ManeuverStep, Side};
pub use robot::{Robot, Steering, Throttle};
