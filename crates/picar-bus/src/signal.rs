//! 终止信号
//!
//! 所有阶段共享同一个单调标志：一旦置位，整个运行期间都不会清除。
//! 每个阶段在每个周期开始时检查一次，因此节奏为 `D` 的阶段最多在
//! 信号置位后 `D` 时间内退出。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// 协作式取消令牌（单调，只能置位）
///
/// 克隆得到的是同一个信号的另一个引用。
///
/// # Example
///
/// ```
/// use picar_bus::TerminationSignal;
///
/// let signal = TerminationSignal::new();
/// let observer = signal.clone();
/// assert!(!observer.is_triggered());
///
/// assert!(signal.trigger());
/// assert!(!signal.trigger()); // 已经置位
/// assert!(observer.is_triggered());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TerminationSignal {
    flag: Arc<AtomicBool>,
}

impl TerminationSignal {
    /// 创建未置位的信号
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位；返回 `true` 表示本次调用完成了置位
    pub fn trigger(&self) -> bool {
        // Release: 置位前的写入对看到 true 的线程可见
        let first = !self.flag.swap(true, Ordering::AcqRel);
        if first {
            info!("Termination signal raised");
        }
        first
    }

    /// 是否已置位
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
