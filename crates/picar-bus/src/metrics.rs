//! 阶段运行指标
//!
//! 原子计数器，阶段线程写入，任意线程读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单个阶段的计数器
#[derive(Debug, Default)]
pub struct StageMetrics {
    /// 完成的周期数
    pub cycles: AtomicU64,
    /// 被吞掉的故障数（本周期不发布新值）
    pub faults: AtomicU64,
}

impl StageMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

/// 阶段计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSnapshot {
    /// 完成的周期数
    pub cycles: u64,
    /// 被吞掉的故障数
    pub faults: u64,
}
