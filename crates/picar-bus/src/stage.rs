//! 阶段（Stage）
//!
//! 管线中的可调度单元，共四种形态：
//!
//! | 形态 | 每个周期 |
//! |---|---|
//! | [`Producer`] | 生成一个值并写入输出邮箱 |
//! | [`Consumer`] | 读取一个或多个输入邮箱并执行动作 |
//! | [`ConsumerProducer`] | 读取输入、变换、写入输出 |
//! | [`Timer`] | 到时后置位终止信号 |
//!
//! 每个阶段都有自己的节奏（周期间休眠时长），并在每个周期开头检查一次终止信号。
//! 阶段之间从不互相等待，只通过邮箱交换最新值。
//!
//! # 故障处理
//!
//! - Producer / ConsumerProducer 的函数失败只影响本周期：记录 `warn!`，
//!   计入 `faults`，不写输出（邮箱保留上一次的值），阶段继续运行。
//! - Consumer 的动作失败是致命的：阶段返回错误，由调度器上报给调用方。

use crate::error::StageError;
use crate::mailbox::Mailbox;
use crate::metrics::StageMetrics;
use crate::signal::TerminationSignal;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 阶段形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// 生产者
    Producer,
    /// 消费者
    Consumer,
    /// 消费-生产者
    ConsumerProducer,
    /// 定时器
    Timer,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Producer => "producer",
            StageKind::Consumer => "consumer",
            StageKind::ConsumerProducer => "consumer-producer",
            StageKind::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// 可调度阶段
///
/// `run` 消费阶段本身：阶段终止后不能重启，新的运行需要新的阶段和邮箱。
pub trait Stage: Send {
    /// 阶段名称（线程名与日志使用）
    fn name(&self) -> &str;

    /// 阶段形态
    fn kind(&self) -> StageKind;

    /// 周期间休眠时长
    fn cadence(&self) -> Duration;

    /// 计数器（调度器在启动前取走一份引用）
    fn metrics(&self) -> Arc<StageMetrics>;

    /// 运行直到观察到终止信号
    fn run(self: Box<Self>) -> Result<(), StageError>;
}

/// 周期间休眠
///
/// 零节奏时只让出 CPU，避免空转独占核心。
fn pause(delay: Duration) {
    if delay.is_zero() {
        std::thread::yield_now();
    } else {
        spin_sleep::sleep(delay);
    }
}

/// 多输入读取
///
/// 为单个邮箱以及二元、三元邮箱元组实现，读取结果按相同形状返回。
pub trait Inputs: Send {
    /// 读取结果
    type Values;

    /// 依次读取每个邮箱的最新值
    fn read_all(&self) -> Self::Values;
}

impl<A> Inputs for Arc<Mailbox<A>>
where
    A: Clone + Send + Sync,
{
    type Values = Option<A>;

    fn read_all(&self) -> Self::Values {
        self.read()
    }
}

impl<A, B> Inputs for (Arc<Mailbox<A>>, Arc<Mailbox<B>>)
where
    A: Clone + Send + Sync,
    B: Clone + Send + Sync,
{
    type Values = (Option<A>, Option<B>);

    fn read_all(&self) -> Self::Values {
        (self.0.read(), self.1.read())
    }
}

impl<A, B, C> Inputs for (Arc<Mailbox<A>>, Arc<Mailbox<B>>, Arc<Mailbox<C>>)
where
    A: Clone + Send + Sync,
    B: Clone + Send + Sync,
    C: Clone + Send + Sync,
{
    type Values = (Option<A>, Option<B>, Option<C>);

    fn read_all(&self) -> Self::Values {
        (self.0.read(), self.1.read(), self.2.read())
    }
}

/// 生产者：`generate()` → 输出邮箱
pub struct Producer<T, F> {
    name: String,
    generate: F,
    output: Arc<Mailbox<T>>,
    delay: Duration,
    signal: TerminationSignal,
    metrics: Arc<StageMetrics>,
}

impl<T, F> Producer<T, F> {
    /// 创建生产者
    pub fn new(
        name: impl Into<String>,
        generate: F,
        output: Arc<Mailbox<T>>,
        delay: Duration,
        signal: TerminationSignal,
    ) -> Self {
        Self {
            name: name.into(),
            generate,
            output,
            delay,
            signal,
            metrics: Arc::new(StageMetrics::new()),
        }
    }
}

impl<T, F, E> Stage for Producer<T, F>
where
    T: Send + Sync + fmt::Debug + 'static,
    F: FnMut() -> Result<T, E> + Send,
    E: fmt::Display,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Producer
    }

    fn cadence(&self) -> Duration {
        self.delay
    }

    fn metrics(&self) -> Arc<StageMetrics> {
        Arc::clone(&self.metrics)
    }

    fn run(mut self: Box<Self>) -> Result<(), StageError> {
        while !self.signal.is_triggered() {
            match (self.generate)() {
                Ok(value) => {
                    debug!("{}: {:?}", self.name, value);
                    self.output.write(value);
                },
                Err(e) => {
                    warn!("{}: no new value this cycle: {}", self.name, e);
                    self.metrics.record_fault();
                },
            }
            self.metrics.record_cycle();
            pause(self.delay);
        }
        Ok(())
    }
}

/// 消费者：读取输入 → `act(values)`
pub struct Consumer<I, F> {
    name: String,
    act: F,
    inputs: I,
    delay: Duration,
    signal: TerminationSignal,
    metrics: Arc<StageMetrics>,
}

impl<I, F> Consumer<I, F> {
    /// 创建消费者
    ///
    /// `inputs` 可以是单个 `Arc<Mailbox<_>>`，也可以是二元、三元元组。
    pub fn new(
        name: impl Into<String>,
        act: F,
        inputs: I,
        delay: Duration,
        signal: TerminationSignal,
    ) -> Self {
        Self {
            name: name.into(),
            act,
            inputs,
            delay,
            signal,
            metrics: Arc::new(StageMetrics::new()),
        }
    }
}

impl<I, F, E> Stage for Consumer<I, F>
where
    I: Inputs,
    F: FnMut(I::Values) -> Result<(), E> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Consumer
    }

    fn cadence(&self) -> Duration {
        self.delay
    }

    fn metrics(&self) -> Arc<StageMetrics> {
        Arc::clone(&self.metrics)
    }

    fn run(mut self: Box<Self>) -> Result<(), StageError> {
        while !self.signal.is_triggered() {
            let values = self.inputs.read_all();
            if let Err(e) = (self.act)(values) {
                error!("{}: action failed: {}", self.name, e);
                self.metrics.record_fault();
                return Err(Box::new(e));
            }
            self.metrics.record_cycle();
            pause(self.delay);
        }
        Ok(())
    }
}

/// 消费-生产者：输入邮箱 → `transform(value)` → 输出邮箱
///
/// 输入邮箱尚未写入时，`transform` 收到 `None`，由它决定缺省输出。
pub struct ConsumerProducer<I, O, F> {
    name: String,
    transform: F,
    input: Arc<Mailbox<I>>,
    output: Arc<Mailbox<O>>,
    delay: Duration,
    signal: TerminationSignal,
    metrics: Arc<StageMetrics>,
}

impl<I, O, F> ConsumerProducer<I, O, F> {
    /// 创建消费-生产者
    pub fn new(
        name: impl Into<String>,
        transform: F,
        input: Arc<Mailbox<I>>,
        output: Arc<Mailbox<O>>,
        delay: Duration,
        signal: TerminationSignal,
    ) -> Self {
        Self {
            name: name.into(),
            transform,
            input,
            output,
            delay,
            signal,
            metrics: Arc::new(StageMetrics::new()),
        }
    }
}

impl<I, O, F, E> Stage for ConsumerProducer<I, O, F>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + fmt::Debug + 'static,
    F: FnMut(Option<I>) -> Result<O, E> + Send,
    E: fmt::Display,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::ConsumerProducer
    }

    fn cadence(&self) -> Duration {
        self.delay
    }

    fn metrics(&self) -> Arc<StageMetrics> {
        Arc::clone(&self.metrics)
    }

    fn run(mut self: Box<Self>) -> Result<(), StageError> {
        while !self.signal.is_triggered() {
            let value = self.input.read();
            match (self.transform)(value) {
                Ok(out) => {
                    debug!("{}: {:?}", self.name, out);
                    self.output.write(out);
                },
                Err(e) => {
                    warn!("{}: no new value this cycle: {}", self.name, e);
                    self.metrics.record_fault();
                },
            }
            self.metrics.record_cycle();
            pause(self.delay);
        }
        Ok(())
    }
}

/// 定时器：运行 `duration` 后置位终止信号
///
/// `duration` 为零表示不自动终止，只等待外部置位。
pub struct Timer {
    name: String,
    duration: Duration,
    poll_delay: Duration,
    signal: TerminationSignal,
    metrics: Arc<StageMetrics>,
}

impl Timer {
    /// 创建定时器
    pub fn new(
        name: impl Into<String>,
        duration: Duration,
        poll_delay: Duration,
        signal: TerminationSignal,
    ) -> Self {
        Self {
            name: name.into(),
            duration,
            poll_delay,
            signal,
            metrics: Arc::new(StageMetrics::new()),
        }
    }

    /// 是否会自动终止
    pub fn is_armed(&self) -> bool {
        !self.duration.is_zero()
    }
}

impl Stage for Timer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StageKind {
        StageKind::Timer
    }

    fn cadence(&self) -> Duration {
        self.poll_delay
    }

    fn metrics(&self) -> Arc<StageMetrics> {
        Arc::clone(&self.metrics)
    }

    fn run(self: Box<Self>) -> Result<(), StageError> {
        let started = Instant::now();
        if !self.is_armed() {
            info!("{}: no time limit, waiting for external termination", self.name);
        }

        loop {
            if self.is_armed() && started.elapsed() >= self.duration {
                info!("{}: {:?} elapsed, terminating", self.name, self.duration);
                self.signal.trigger();
                return Ok(());
            }
            if self.signal.is_triggered() {
                return Ok(());
            }
            self.metrics.record_cycle();
            pause(self.poll_delay);
        }
    }
}
