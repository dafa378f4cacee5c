//! 调度器
//!
//! 每个阶段一个具名 OS 线程，同时启动，互不等待。调度器阻塞直到所有线程退出。
//!
//! 阶段结束时通过 `crossbeam-channel` 上报结果：
//! - 普通阶段失败或 panic：置位终止信号，让其余阶段在一个节奏内收尾，
//!   全部退出后返回第一个致命错误
//! - 定时器 panic：立即记录 `error!`，不置位终止信号（此时运行不会自动结束，
//!   需要宿主置位）

use crate::error::{BusError, StageError};
use crate::metrics::{StageMetrics, StageSnapshot};
use crate::signal::TerminationSignal;
use crate::stage::{Stage, StageKind};
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 阶段退出方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// 观察到终止信号后正常退出
    Completed,
    /// 阶段函数返回致命错误（错误信息）
    Failed(String),
    /// 阶段线程 panic（panic 信息）
    Panicked(String),
}

impl StageOutcome {
    /// 是否正常退出
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }
}

/// 单个阶段的运行报告
#[derive(Debug, Clone)]
pub struct StageReport {
    /// 阶段名称
    pub name: String,
    /// 阶段形态
    pub kind: StageKind,
    /// 退出方式
    pub outcome: StageOutcome,
    /// 退出时的计数器快照
    pub metrics: StageSnapshot,
    /// 从调度器启动到该阶段退出的时长
    pub exited_after: Duration,
}

/// 一次运行的报告（按添加顺序列出阶段）
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// 各阶段报告
    pub stages: Vec<StageReport>,
    /// 从启动第一个阶段到最后一个阶段退出的时长
    pub elapsed: Duration,
}

impl RunReport {
    /// 按名称查找阶段报告
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// 是否所有阶段都正常退出
    pub fn all_completed(&self) -> bool {
        self.stages.iter().all(|s| s.outcome.is_completed())
    }
}

/// 阶段线程结束时发给调度器的消息
enum Exit {
    Completed,
    Failed(StageError),
    Panicked(String),
}

struct Running {
    name: String,
    kind: StageKind,
    metrics: Arc<StageMetrics>,
    handle: JoinHandle<()>,
}

/// 线程每阶段调度器
///
/// # Example
///
/// ```
/// use picar_bus::{Mailbox, Producer, Scheduler, TerminationSignal, Timer};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let signal = TerminationSignal::new();
/// let bus = Arc::new(Mailbox::new("ticks"));
/// let report = Scheduler::new(signal.clone())
///     .with_stage(Producer::new(
///         "tick",
///         || Ok::<_, std::fmt::Error>(1u8),
///         Arc::clone(&bus),
///         Duration::from_millis(1),
///         signal.clone(),
///     ))
///     .with_stage(Timer::new(
///         "timer",
///         Duration::from_millis(20),
///         Duration::from_millis(1),
///         signal.clone(),
///     ))
///     .run()
///     .unwrap();
///
/// assert!(report.all_completed());
/// assert_eq!(bus.read(), Some(1));
/// ```
pub struct Scheduler {
    signal: TerminationSignal,
    stages: Vec<Box<dyn Stage>>,
}

impl Scheduler {
    /// 创建调度器；`signal` 应与各阶段共享同一个终止信号
    pub fn new(signal: TerminationSignal) -> Self {
        Self {
            signal,
            stages: Vec::new(),
        }
    }

    /// 终止信号
    pub fn signal(&self) -> &TerminationSignal {
        &self.signal
    }

    /// 添加阶段
    pub fn add(&mut self, stage: impl Stage + 'static) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// 添加已装箱的阶段
    pub fn add_boxed(&mut self, stage: Box<dyn Stage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// 链式添加阶段
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.add(stage);
        self
    }

    /// 阶段数量
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// 是否没有阶段
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 启动所有阶段并等待全部退出
    ///
    /// 没有定时器且没有外部置位时，此调用不会返回。
    pub fn run(self) -> Result<RunReport, BusError> {
        let Scheduler { signal, stages } = self;
        let started = Instant::now();
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded::<(usize, Exit, Instant)>();

        info!("Scheduler starting {} stages", stages.len());

        let mut running = Vec::with_capacity(stages.len());
        for (index, stage) in stages.into_iter().enumerate() {
            let name = stage.name().to_string();
            let kind = stage.kind();
            let metrics = stage.metrics();

            match spawn_stage(index, stage, exit_tx.clone()) {
                Ok(handle) => running.push(Running {
                    name,
                    kind,
                    metrics,
                    handle,
                }),
                Err(e) => {
                    error!("Failed to spawn stage `{}`: {}", name, e);
                    signal.trigger();
                    drop(exit_tx);
                    join_all(running);
                    return Err(BusError::Spawn {
                        stage: name,
                        source: e,
                    });
                },
            }
        }
        // 所有阶段线程退出后，接收端才会断开
        drop(exit_tx);

        let mut outcomes: Vec<StageOutcome> = vec![StageOutcome::Completed; running.len()];
        let mut exit_times: Vec<Option<Duration>> = vec![None; running.len()];
        let mut first_error: Option<BusError> = None;

        for (index, exit, exited_at) in exit_rx.iter() {
            let stage = &running[index];
            exit_times[index] = Some(exited_at.saturating_duration_since(started));
            match exit {
                Exit::Completed => {
                    info!("Stage `{}` exited", stage.name);
                },
                Exit::Failed(source) => {
                    outcomes[index] = StageOutcome::Failed(source.to_string());
                    if stage.kind == StageKind::Timer {
                        error!("Timer `{}` failed: {}", stage.name, source);
                        continue;
                    }
                    error!("Stage `{}` failed: {}, terminating", stage.name, source);
                    signal.trigger();
                    if first_error.is_none() {
                        first_error = Some(BusError::StageFailed {
                            stage: stage.name.clone(),
                            source,
                        });
                    }
                },
                Exit::Panicked(message) => {
                    outcomes[index] = StageOutcome::Panicked(message.clone());
                    if stage.kind == StageKind::Timer {
                        error!(
                            "Timer `{}` panicked: {}; run will not terminate automatically",
                            stage.name, message
                        );
                        continue;
                    }
                    error!("Stage `{}` panicked: {}, terminating", stage.name, message);
                    signal.trigger();
                    if first_error.is_none() {
                        first_error = Some(BusError::StagePanicked {
                            stage: stage.name.clone(),
                            message,
                        });
                    }
                },
            }
        }

        let stages = running
            .into_iter()
            .zip(outcomes)
            .zip(exit_times)
            .map(|((stage, outcome), exited)| {
                if stage.handle.join().is_err() {
                    warn!("Stage `{}` thread did not join cleanly", stage.name);
                }
                StageReport {
                    name: stage.name,
                    kind: stage.kind,
                    outcome,
                    metrics: stage.metrics.snapshot(),
                    exited_after: exited.unwrap_or_else(|| started.elapsed()),
                }
            })
            .collect();

        let elapsed = started.elapsed();
        info!("Scheduler finished after {:?}", elapsed);

        match first_error {
            Some(e) => Err(e),
            None => Ok(RunReport { stages, elapsed }),
        }
    }
}

fn spawn_stage(
    index: usize,
    stage: Box<dyn Stage>,
    exit_tx: Sender<(usize, Exit, Instant)>,
) -> std::io::Result<JoinHandle<()>> {
    let name = stage.name().to_string();
    thread::Builder::new().name(name.clone()).spawn(move || {
        info!("Stage `{}` ({}) started, cadence {:?}", name, stage.kind(), stage.cadence());
        let exit = match panic::catch_unwind(AssertUnwindSafe(move || stage.run())) {
            Ok(Ok(())) => Exit::Completed,
            Ok(Err(e)) => Exit::Failed(e),
            Err(payload) => Exit::Panicked(panic_message(payload.as_ref())),
        };
        // 调度器已经返回时接收端可能不存在
        let _ = exit_tx.send((index, exit, Instant::now()));
    })
}

fn join_all(running: Vec<Running>) {
    for stage in running {
        if stage.handle.join().is_err() {
            warn!("Stage `{}` thread did not join cleanly", stage.name);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
