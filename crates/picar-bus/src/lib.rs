//! # picar-bus - 并发总线层
//!
//! 以"最新值"语义在独立节奏的阶段之间传递数据。
//!
//! ## 包含模块
//!
//! - `mailbox` - 单槽、覆盖写、无锁读的邮箱
//! - `signal` - 单调终止信号（协作式取消令牌）
//! - `stage` - 四种阶段形态：Producer / Consumer / ConsumerProducer / Timer
//! - `scheduler` - 线程每阶段调度器，汇总运行报告
//! - `metrics` - 阶段计数器
//!
//! ## 保证
//!
//! - 读取永不阻塞，也不会看到写了一半的值
//! - 终止信号置位后，节奏为 `D` 的阶段在 `D` 内退出
//! - 阶段之间没有顺序保证；两次读取间的中间写入会丢失

mod error;
pub mod mailbox;
pub mod metrics;
pub mod scheduler;
pub mod signal;
pub mod stage;

pub use error::{BusError, StageError};
pub use mailbox::{Mailbox, MailboxSnapshot, Stamped};
pub use metrics::{StageMetrics, StageSnapshot};
pub use scheduler::{RunReport, Scheduler, StageOutcome, StageReport};
pub use signal::TerminationSignal;
pub use stage::{Consumer, ConsumerProducer, Inputs, Producer, Stage, StageKind, Timer};
