//! 同步巡线
//!
//! 单线程版本：每次调用 [`LineFollower::follow_line`] 依次完成
//! 读取 → 解释 → 控制 → 执行。适合不需要独立节奏的简单场景和调试。

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use picar_bus::TerminationSignal;
use picar_control::{ActuationDispatch, Actuator, DriveCommand, SteeringController};
use picar_sense::{
    DirectionClassifier, GrayscaleAdc, LineInterpreter, ObstacleGate, SensorSource, SourceKind,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次巡线周期的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowStep {
    /// 方向标量
    pub direction: f64,
    /// 转向角（度）
    pub angle: f64,
    /// 障碍物标志
    pub obstacle: bool,
    /// 发出的指令
    pub command: DriveCommand,
}

/// 同步巡线器
///
/// 传感器故障不会中断巡线：沿用上一次的方向与障碍物标志并记录 `warn!`。
/// 执行器故障会返回给调用方。
pub struct LineFollower<A> {
    line_source: SensorSource,
    obstacle_source: Option<SensorSource>,
    interpreter: LineInterpreter,
    gate: ObstacleGate,
    controller: SteeringController,
    dispatch: ActuationDispatch<A>,
    obstacle: bool,
}

impl<A: Actuator> LineFollower<A> {
    /// 创建巡线器（校验配置）
    pub fn new(
        config: &PipelineConfig,
        line_source: SensorSource,
        actuator: A,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if line_source.kind() == SourceKind::Ultrasonic {
            return Err(PipelineError::SourceMismatch {
                role: "line source",
                kind: line_source.kind(),
            });
        }
        Ok(Self {
            line_source,
            obstacle_source: None,
            interpreter: LineInterpreter::new(DirectionClassifier::new(
                config.thresholds(),
                config.polarity()?,
            )),
            gate: ObstacleGate::new(config.obstacle_threshold),
            controller: SteeringController::new(config.scale),
            dispatch: ActuationDispatch::new(actuator, config.speed),
            obstacle: false,
        })
    }

    /// 以灰度模块巡线，归一化方式取自配置
    pub fn grayscale(
        config: &PipelineConfig,
        adc: impl GrayscaleAdc + 'static,
        actuator: A,
    ) -> Result<Self, PipelineError> {
        Self::new(
            config,
            SensorSource::grayscale(adc, config.normalization),
            actuator,
        )
    }

    /// 加入超声波避障
    pub fn with_obstacle_source(mut self, source: SensorSource) -> Result<Self, PipelineError> {
        if source.kind() != SourceKind::Ultrasonic {
            return Err(PipelineError::SourceMismatch {
                role: "obstacle source",
                kind: source.kind(),
            });
        }
        self.obstacle_source = Some(source);
        Ok(self)
    }

    /// 执行一个巡线周期
    pub fn follow_line(&mut self) -> Result<FollowStep, PipelineError> {
        let direction = match self
            .line_source
            .read()
            .and_then(|r| self.interpreter.interpret(Some(&r)))
        {
            Ok(direction) => direction,
            Err(e) => {
                warn!("Line sensor fault, keeping direction {}: {}", self.interpreter.last(), e);
                self.interpreter.last()
            },
        };

        if let Some(source) = &mut self.obstacle_source {
            match source.read().and_then(|r| self.gate.interpret(Some(&r))) {
                Ok(obstacle) => self.obstacle = obstacle,
                Err(e) => warn!("Ultrasonic fault, keeping obstacle={}: {}", self.obstacle, e),
            }
        }

        let angle = self.controller.angle(Some(direction));
        let command = self.dispatch.apply(angle, self.obstacle)?;
        debug!("direction {} angle {} -> {}", direction, angle, command);

        Ok(FollowStep {
            direction,
            angle,
            obstacle: self.obstacle,
            command,
        })
    }

    /// 以 `delay` 为周期巡线，直到终止信号置位，然后停车
    ///
    /// 返回完成的周期数。执行器故障时立即返回错误（已尝试停车）。
    pub fn follow_until(
        &mut self,
        signal: &TerminationSignal,
        delay: Duration,
    ) -> Result<u64, PipelineError> {
        let mut cycles = 0;
        while !signal.is_triggered() {
            self.follow_line()?;
            cycles += 1;
            spin_sleep::sleep(delay);
        }
        self.dispatch.stop()?;
        info!("Line following stopped after {} cycles", cycles);
        Ok(cycles)
    }

    /// 停车
    pub fn stop(&mut self) -> Result<(), PipelineError> {
        Ok(self.dispatch.stop()?)
    }

    /// 执行器引用
    pub fn actuator(&self) -> &A {
        self.dispatch.actuator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picar_control::sim::SimulatedCar;
    use picar_sense::Normalization;
    use picar_sense::sim::{ScriptedCamera, ScriptedGrayscale, ScriptedRangefinder};

    #[test]
    fn test_follow_line_steers_by_classification() {
        // 右侧通道明显变暗 → 右急转
        let source = SensorSource::grayscale(
            ScriptedGrayscale::new(vec![[1.0, 1.1, 0.1]]),
            Normalization::Mean,
        );
        let mut follower =
            LineFollower::new(&PipelineConfig::default(), source, SimulatedCar::new()).unwrap();
        // 归一化后的边沿同样满足右急转
        let step = follower.follow_line().unwrap();
        assert_eq!(step.direction, 1.0);
        assert_eq!(step.angle, 30.0);
        assert_eq!(
            step.command,
            DriveCommand::Drive {
                speed: 22.0,
                angle: 30.0
            }
        );
    }

    #[test]
    fn test_grayscale_uses_configured_normalization() {
        let raw = vec![[3.0, 2.0, 4.0]];

        // 均值归一化：(1, 0.67, 1.33)，左边沿弱 → 左轻微
        let config = PipelineConfig::default();
        let mut follower =
            LineFollower::grayscale(&config, ScriptedGrayscale::new(raw.clone()), SimulatedCar::new())
                .unwrap();
        assert_eq!(follower.follow_line().unwrap().direction, -0.5);

        // z-score：(0, -1.22, 1.22)，两侧边沿都超过高阈值 → 直行
        let config = PipelineConfig::from_toml_str("normalization = \"z_score\"").unwrap();
        assert_eq!(config.normalization, Normalization::ZScore);
        let mut follower =
            LineFollower::grayscale(&config, ScriptedGrayscale::new(raw), SimulatedCar::new())
                .unwrap();
        let step = follower.follow_line().unwrap();
        assert_eq!(step.direction, 0.0);
        assert_eq!(step.angle, 0.0);
    }

    #[test]
    fn test_camera_without_line_keeps_previous_direction() {
        let camera = ScriptedCamera::new(vec![Some(-0.4), None, None]);
        let mut follower = LineFollower::new(
            &PipelineConfig::default(),
            SensorSource::camera(camera),
            SimulatedCar::new(),
        )
        .unwrap();

        assert_eq!(follower.follow_line().unwrap().direction, -0.4);
        assert_eq!(follower.follow_line().unwrap().direction, -0.4);
        assert!((follower.follow_line().unwrap().angle + 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_obstacle_stops_and_sensor_fault_holds_flag() {
        let ranger = ScriptedRangefinder::new(vec![10.0]);
        let ranger_handle = ranger.handle();
        let source = SensorSource::grayscale(
            ScriptedGrayscale::new(vec![[40.0, 10.0, 40.0]]),
            Normalization::Mean,
        );
        let mut follower = LineFollower::new(&PipelineConfig::default(), source, SimulatedCar::new())
            .unwrap()
            .with_obstacle_source(SensorSource::ultrasonic(ranger))
            .unwrap();

        let step = follower.follow_line().unwrap();
        assert!(step.obstacle);
        assert_eq!(step.command, DriveCommand::Stop);

        ranger_handle.fail_next("echo timeout");
        let step = follower.follow_line().unwrap();
        assert!(step.obstacle);

        ranger_handle.set(-1.0);
        let step = follower.follow_line().unwrap();
        assert!(!step.obstacle);
        assert!(!step.command.is_stop());
    }

    #[test]
    fn test_actuator_fault_is_returned() {
        let car = SimulatedCar::new();
        car.handle().fail_drive(picar_control::ActuatorFault::Disconnected);
        let source = SensorSource::camera(ScriptedCamera::new(vec![Some(0.0)]));
        let mut follower = LineFollower::new(&PipelineConfig::default(), source, car).unwrap();
        let err = follower.follow_line().unwrap_err();
        assert_eq!(
            err.actuator_fault(),
            Some(&picar_control::ActuatorFault::Disconnected)
        );
    }

    #[test]
    fn test_follow_until_stops_on_signal() {
        let signal = TerminationSignal::new();
        let car = SimulatedCar::new();
        let log = car.handle();
        let source = SensorSource::camera(ScriptedCamera::new(vec![Some(0.2)]));
        let mut follower = LineFollower::new(&PipelineConfig::default(), source, car).unwrap();

        let remote = signal.clone();
        let trigger = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.trigger();
        });
        let cycles = follower.follow_until(&signal, Duration::from_millis(2)).unwrap();
        trigger.join().unwrap();

        assert!(cycles > 0);
        assert_eq!(log.last(), Some(DriveCommand::Stop));
    }

    proptest::proptest! {
        #[test]
        fn prop_camera_offset_maps_to_scaled_angle(
            offset in -1.0f64..=1.0,
            obstacle_distance in 0.0f64..200.0,
        ) {
            let ranger = ScriptedRangefinder::new(vec![obstacle_distance]);
            let source = SensorSource::camera(ScriptedCamera::new(vec![Some(offset)]));
            let mut follower =
                LineFollower::new(&PipelineConfig::default(), source, SimulatedCar::new())
                    .unwrap()
                    .with_obstacle_source(SensorSource::ultrasonic(ranger))
                    .unwrap();

            let step = follower.follow_line().unwrap();
            proptest::prop_assert!((step.angle - offset * 30.0).abs() < 1e-9);
            let expected = obstacle_distance > 0.0 && obstacle_distance <= 15.0;
            proptest::prop_assert_eq!(step.obstacle, expected);
            proptest::prop_assert_eq!(step.command.is_stop(), step.obstacle);
        }
    }
}
