//! 巡线管线装配
//!
//! ```text
//! 巡线传感器 ──Producer──▶ [line_raw] ──ConsumerProducer(解释)──▶ [direction]
//!                                                                    │
//!                                          ConsumerProducer(控制) ◀──┘
//!                                                   │
//!                                                   ▼
//! 超声波 ──Producer──▶ [range_raw] ──ConsumerProducer(判定)──▶ [obstacle]  [angle]
//!                                                                 │          │
//!                                                                 ▼          ▼
//!                                                    Consumer(执行: 障碍物优先停车)
//!
//! Timer ──▶ 终止信号（所有阶段每个周期检查一次）
//! ```
//!
//! 各阶段独立节奏，互不等待。运行结束（定时器到时、宿主置位或执行器故障）后
//! 再向执行器发一次停车指令。

use crate::config::{PipelineConfig, seconds};
use crate::error::PipelineError;
use parking_lot::Mutex;
use picar_bus::{
    Consumer, ConsumerProducer, Mailbox, MailboxSnapshot, Producer, RunReport, Scheduler,
    StageReport, TerminationSignal, Timer,
};
use picar_control::{
    ActuationDispatch, Actuator, DriveCommand, Robot, Steering, SteeringController, Throttle,
};
use picar_sense::{
    DirectionClassifier, GrayscaleAdc, LineInterpreter, ObstacleGate, Reading, SensorSource,
    SourceKind,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 阶段名称
pub mod stage_names {
    /// 巡线传感器读取
    pub const READ_LINE: &str = "Read line sensor";
    /// 超声波读取
    pub const READ_OBSTACLE: &str = "Read ultrasonic sensor";
    /// 巡线解释
    pub const INTERPRET_LINE: &str = "Interpret line sensor";
    /// 障碍物判定
    pub const INTERPRET_OBSTACLE: &str = "Interpret ultrasonic sensor";
    /// 转向控制
    pub const CONTROL: &str = "Control angle";
    /// 执行
    pub const ACTUATION: &str = "Robot control";
    /// 终止定时器
    pub const TIMER: &str = "Termination timer";
}

/// 管线中的邮箱
///
/// 克隆得到的是同一组邮箱；宿主可以在运行期间观察中间结果。
#[derive(Debug, Clone)]
pub struct PipelineBuses {
    /// 巡线原始读数
    pub line_raw: Arc<Mailbox<Reading>>,
    /// 测距原始读数
    pub range_raw: Arc<Mailbox<Reading>>,
    /// 方向标量
    pub direction: Arc<Mailbox<f64>>,
    /// 障碍物标志
    pub obstacle: Arc<Mailbox<bool>>,
    /// 转向角
    pub angle: Arc<Mailbox<f64>>,
}

impl PipelineBuses {
    fn new() -> Self {
        Self {
            line_raw: Arc::new(Mailbox::new("line sensor bus")),
            range_raw: Arc::new(Mailbox::new("ultrasonic sensor bus")),
            direction: Arc::new(Mailbox::new("direction bus")),
            obstacle: Arc::new(Mailbox::new("obstacle bus")),
            angle: Arc::new(Mailbox::new("control angle bus")),
        }
    }

    /// 各邮箱的计数器快照
    pub fn snapshot(&self) -> Vec<(String, MailboxSnapshot)> {
        vec![
            (self.line_raw.name().to_string(), self.line_raw.metrics()),
            (self.range_raw.name().to_string(), self.range_raw.metrics()),
            (self.direction.name().to_string(), self.direction.metrics()),
            (self.obstacle.name().to_string(), self.obstacle.metrics()),
            (self.angle.name().to_string(), self.angle.metrics()),
        ]
    }
}

/// 一次运行的报告
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// 调度器报告
    pub run: RunReport,
    /// 邮箱计数器
    pub mailboxes: Vec<(String, MailboxSnapshot)>,
    /// 运行期间最后一条执行指令（不含收尾停车）
    pub last_command: Option<DriveCommand>,
    /// 收尾停车是否成功
    pub stopped: bool,
}

impl PipelineReport {
    /// 按名称查找阶段报告
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.run.stage(name)
    }

    /// 运行时长
    pub fn elapsed(&self) -> Duration {
        self.run.elapsed
    }
}

/// 管线构建器
pub struct LineFollowPipelineBuilder {
    config: PipelineConfig,
    line_source: Option<SensorSource>,
    obstacle_source: Option<SensorSource>,
    actuator: Option<Box<dyn Actuator>>,
    signal: Option<TerminationSignal>,
}

impl LineFollowPipelineBuilder {
    /// 巡线传感源（灰度或摄像头，必需）
    pub fn line_source(mut self, source: SensorSource) -> Self {
        self.line_source = Some(source);
        self
    }

    /// 灰度模块作为巡线传感源，按配置的 `normalization` 归一化
    pub fn grayscale(self, adc: impl GrayscaleAdc + 'static) -> Self {
        let normalization = self.config.normalization;
        self.line_source(SensorSource::grayscale(adc, normalization))
    }

    /// 障碍物传感源（超声波，可选）
    pub fn obstacle_source(mut self, source: SensorSource) -> Self {
        self.obstacle_source = Some(source);
        self
    }

    /// 执行器（必需）
    pub fn actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        self.actuator = Some(Box::new(actuator));
        self
    }

    /// 舵机 + 电机组合成的车辆，按配置限幅
    pub fn robot<S, T>(self, steering: S, throttle: T) -> Self
    where
        S: Steering + 'static,
        T: Throttle + 'static,
    {
        let max = self.config.max_steering_angle;
        self.actuator(Robot::new(steering, throttle).with_max_steering_angle(max))
    }

    /// 外部终止信号（默认新建一个）
    pub fn termination(mut self, signal: TerminationSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// 校验配置与协作方
    pub fn build(self) -> Result<LineFollowPipeline, PipelineError> {
        self.config.validate()?;

        let line_source = self
            .line_source
            .ok_or(PipelineError::MissingCollaborator("line source"))?;
        if line_source.kind() == SourceKind::Ultrasonic {
            return Err(PipelineError::SourceMismatch {
                role: "line source",
                kind: line_source.kind(),
            });
        }

        if let Some(source) = &self.obstacle_source {
            if source.kind() != SourceKind::Ultrasonic {
                return Err(PipelineError::SourceMismatch {
                    role: "obstacle source",
                    kind: source.kind(),
                });
            }
        }

        let actuator = self
            .actuator
            .ok_or(PipelineError::MissingCollaborator("actuator"))?;

        Ok(LineFollowPipeline {
            config: self.config,
            line_source,
            obstacle_source: self.obstacle_source,
            actuator,
            signal: self.signal.unwrap_or_default(),
            buses: PipelineBuses::new(),
        })
    }
}

/// 并发巡线管线
///
/// 只能运行一次；再次运行需要重新构建（新的邮箱与阶段）。
pub struct LineFollowPipeline {
    config: PipelineConfig,
    line_source: SensorSource,
    obstacle_source: Option<SensorSource>,
    actuator: Box<dyn Actuator>,
    signal: TerminationSignal,
    buses: PipelineBuses,
}

impl LineFollowPipeline {
    /// 创建构建器
    pub fn builder(config: PipelineConfig) -> LineFollowPipelineBuilder {
        LineFollowPipelineBuilder {
            config,
            line_source: None,
            obstacle_source: None,
            actuator: None,
            signal: None,
        }
    }

    /// 配置
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 终止信号（宿主置位即可结束运行）
    pub fn termination(&self) -> TerminationSignal {
        self.signal.clone()
    }

    /// 邮箱（运行前取走一份即可在运行期间观察）
    pub fn buses(&self) -> PipelineBuses {
        self.buses.clone()
    }

    /// 运行直到终止
    ///
    /// 执行器故障或阶段 panic 会结束运行并返回错误；收尾停车总会尝试一次。
    pub fn run(self) -> Result<PipelineReport, PipelineError> {
        let LineFollowPipeline {
            config,
            mut line_source,
            obstacle_source,
            actuator,
            signal,
            buses,
        } = self;
        let delays = &config.delays;

        let mut interpreter =
            LineInterpreter::new(DirectionClassifier::new(config.thresholds(), config.polarity()?));
        let gate = ObstacleGate::new(config.obstacle_threshold);
        let controller = SteeringController::new(config.scale);
        let dispatch = Arc::new(Mutex::new(ActuationDispatch::new(actuator, config.speed)));

        info!(
            "Starting line-follow pipeline: {:?} line source, obstacle source: {}, time limit: {:?}",
            line_source.kind(),
            obstacle_source.is_some(),
            config.terminate_after()
        );

        let mut scheduler = Scheduler::new(signal.clone());

        scheduler.add(Producer::new(
            stage_names::READ_LINE,
            move || line_source.read(),
            Arc::clone(&buses.line_raw),
            seconds(delays.line_sensor),
            signal.clone(),
        ));

        scheduler.add(ConsumerProducer::new(
            stage_names::INTERPRET_LINE,
            move |reading: Option<Reading>| interpreter.interpret(reading.as_ref()),
            Arc::clone(&buses.line_raw),
            Arc::clone(&buses.direction),
            seconds(delays.line_interpreter),
            signal.clone(),
        ));

        scheduler.add(ConsumerProducer::new(
            stage_names::CONTROL,
            move |direction: Option<f64>| Ok::<_, Infallible>(controller.angle(direction)),
            Arc::clone(&buses.direction),
            Arc::clone(&buses.angle),
            seconds(delays.controller),
            signal.clone(),
        ));

        match obstacle_source {
            Some(mut source) => {
                scheduler.add(Producer::new(
                    stage_names::READ_OBSTACLE,
                    move || source.read(),
                    Arc::clone(&buses.range_raw),
                    seconds(delays.obstacle_sensor),
                    signal.clone(),
                ));
                scheduler.add(ConsumerProducer::new(
                    stage_names::INTERPRET_OBSTACLE,
                    move |reading: Option<Reading>| gate.interpret(reading.as_ref()),
                    Arc::clone(&buses.range_raw),
                    Arc::clone(&buses.obstacle),
                    seconds(delays.obstacle_interpreter),
                    signal.clone(),
                ));

                let dispatch = Arc::clone(&dispatch);
                scheduler.add(Consumer::new(
                    stage_names::ACTUATION,
                    move |(angle, obstacle): (Option<f64>, Option<bool>)| {
                        dispatch.lock().apply_latest(angle, obstacle).map(|_| ())
                    },
                    (Arc::clone(&buses.angle), Arc::clone(&buses.obstacle)),
                    seconds(delays.actuation),
                    signal.clone(),
                ));
            },
            None => {
                let dispatch = Arc::clone(&dispatch);
                scheduler.add(Consumer::new(
                    stage_names::ACTUATION,
                    move |angle: Option<f64>| dispatch.lock().apply_latest(angle, None).map(|_| ()),
                    Arc::clone(&buses.angle),
                    seconds(delays.actuation),
                    signal.clone(),
                ));
            },
        }

        scheduler.add(Timer::new(
            stage_names::TIMER,
            config.terminate_after().unwrap_or(Duration::ZERO),
            config.timer_poll_delay(),
            signal.clone(),
        ));

        let result = scheduler.run();

        // 收尾停车：所有阶段线程都已退出，这里独占执行器
        let mut dispatch = dispatch.lock();
        let last_command = dispatch.last_command();
        let stopped = match dispatch.stop() {
            Ok(()) => true,
            Err(e) => {
                warn!("Final stop failed: {}", e);
                false
            },
        };

        let run = result?;
        info!("Line-follow pipeline finished after {:?}", run.elapsed);
        Ok(PipelineReport {
            run,
            mailboxes: buses.snapshot(),
            last_command,
            stopped,
        })
    }
}

impl std::fmt::Debug for LineFollowPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineFollowPipeline")
            .field("config", &self.config)
            .field("line_source", &self.line_source)
            .field("obstacle_source", &self.obstacle_source)
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}
