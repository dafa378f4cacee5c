//! 单槽邮箱
//!
//! 阶段之间只传递"最新值"：写入无条件覆盖，读取永不阻塞。
//! 两次读取之间的中间写入会丢失。
//!
//! 底层使用 `ArcSwapOption`，读写都是无锁的，读者不可能看到写了一半的值。
//!
//! 多个生产者写同一个邮箱是允许的，但读者无法区分来源（已知竞争）。

use arc_swap::ArcSwapOption;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 单槽、覆盖写、读最新的共享邮箱
///
/// # Example
///
/// ```
/// use picar_bus::Mailbox;
///
/// let bus = Mailbox::new("control angle");
/// assert_eq!(bus.read(), None);
///
/// bus.write(10.0);
/// bus.write(15.0);
/// assert_eq!(bus.read(), Some(15.0));
/// assert_eq!(bus.read_or(0.0), 15.0);
/// ```
#[derive(Debug)]
pub struct Mailbox<T> {
    name: String,
    slot: ArcSwapOption<Stamped<T>>,
    writes: AtomicU64,
    reads: AtomicU64,
    /// 读者见过的最大写入序号
    last_read: AtomicU64,
    /// 被读到过的不同写入数
    seen: AtomicU64,
}

/// 带写入序号的邮箱值
///
/// 序号从 1 开始；初始值的序号为 0。
#[derive(Debug)]
pub struct Stamped<T> {
    seq: u64,
    value: T,
}

impl<T> Stamped<T> {
    /// 写入序号
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl<T> Deref for Stamped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Mailbox<T> {
    /// 创建空邮箱
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: ArcSwapOption::empty(),
            writes: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            last_read: AtomicU64::new(0),
            seen: AtomicU64::new(0),
        }
    }

    /// 创建带初始值的邮箱（初始值不计入写入次数）
    pub fn with_initial(name: impl Into<String>, value: T) -> Self {
        let mailbox = Self::new(name);
        mailbox.slot.store(Some(Arc::new(Stamped { seq: 0, value })));
        mailbox
    }

    /// 邮箱名称（用于日志）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 写入新值，覆盖旧值，立即返回
    pub fn write(&self, value: T) {
        let seq = self.writes.fetch_add(1, Ordering::AcqRel) + 1;
        self.slot.store(Some(Arc::new(Stamped { seq, value })));
    }

    /// 读取当前值的共享引用（不克隆值本身）
    pub fn load(&self) -> Option<Arc<Stamped<T>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entry = self.slot.load_full()?;
        if self.last_read.fetch_max(entry.seq, Ordering::AcqRel) < entry.seq {
            self.seen.fetch_add(1, Ordering::AcqRel);
        }
        Some(entry)
    }

    /// 是否写入过值（或带初始值）
    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }

    /// 计数器快照
    ///
    /// `overwritten` 由写入序号推出：写入总数减去被读到过的写入，
    /// 再减去尚未被读的当前值。先读 `seen` 再读 `writes`，保证差值不为负。
    pub fn metrics(&self) -> MailboxSnapshot {
        let seen = self.seen.load(Ordering::Acquire);
        let last_read = self.last_read.load(Ordering::Acquire);
        let current = self.slot.load().as_ref().map_or(0, |entry| entry.seq);
        let writes = self.writes.load(Ordering::Acquire);
        let pending = u64::from(current > last_read);
        MailboxSnapshot {
            writes,
            reads: self.reads.load(Ordering::Relaxed),
            overwritten: writes.saturating_sub(seen + pending),
        }
    }
}

impl<T: Clone> Mailbox<T> {
    /// 读取最新值；从未写入时返回 `None`
    pub fn read(&self) -> Option<T> {
        self.load().map(|entry| entry.value.clone())
    }

    /// 读取最新值；从未写入时返回 `default`
    pub fn read_or(&self, default: T) -> T {
        self.read().unwrap_or(default)
    }
}

/// 邮箱计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxSnapshot {
    /// 写入次数
    pub writes: u64,
    /// 读取次数
    pub reads: u64,
    /// 被覆盖而从未被读到的写入次数
    ///
    /// 单写者单读者时，写读停止后该值精确；写读进行中的快照可能
    /// 把刚写入、尚未发布的值暂计为被覆盖。多读者时一个读者读到的旧值
    /// 可能已被另一读者的更新序号掩盖，计数偏大。
    /// 恒有 `overwritten <= writes`。
    ///
    /// 快速增长说明消费者的节奏明显慢于生产者。
    pub overwritten: u64,
}
