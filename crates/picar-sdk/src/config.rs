//! 管线配置
//!
//! 所有时长以秒为单位的浮点数保存（与 TOML 文件一致），
//! 通过访问方法转换成 `Duration`。构建管线前必须通过 [`PipelineConfig::validate`]。
//!
//! ```toml
//! low_threshold = 0.35
//! high_threshold = 0.8
//! polarity = -1
//! normalization = "mean"
//! obstacle_threshold = 15.0
//! scale = 30.0
//! speed = 22.0
//! terminate_after = 60.0
//!
//! [delays]
//! line_sensor = 0.05
//! actuation = 0.15
//! ```

use picar_sense::{Normalization, Polarity, Thresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误（构建期致命）
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 阈值必须满足 `0 ≤ low < high`
    #[error("Invalid thresholds: low={low}, high={high} (need 0 <= low < high)")]
    InvalidThresholds {
        /// 低阈值
        low: f64,
        /// 高阈值
        high: f64,
    },

    /// 阶段节奏不能为负
    #[error("Negative delay for `{stage}`: {seconds}s")]
    NegativeDelay {
        /// 阶段
        stage: &'static str,
        /// 配置值（秒）
        seconds: f64,
    },

    /// 障碍物距离阈值必须为正
    #[error("Invalid obstacle threshold: {0} (must be positive)")]
    InvalidThreshold(f64),

    /// 极性只能是 -1 或 +1
    #[error("Invalid polarity: {0} (must be -1 or +1)")]
    InvalidPolarity(i8),

    /// 时长必须是非负的有限值
    #[error("Invalid duration for `{field}`: {seconds}s")]
    InvalidDuration {
        /// 字段
        field: &'static str,
        /// 配置值（秒）
        seconds: f64,
    },

    /// 数值参数必须是有限值
    #[error("Invalid value for `{field}`: {value}")]
    InvalidParameter {
        /// 字段
        field: &'static str,
        /// 配置值
        value: f64,
    },

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<picar_sense::InvalidPolarity> for ConfigError {
    fn from(e: picar_sense::InvalidPolarity) -> Self {
        ConfigError::InvalidPolarity(e.0)
    }
}

/// 各阶段节奏（秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageDelays {
    /// 巡线传感器读取
    pub line_sensor: f64,
    /// 超声波读取
    pub obstacle_sensor: f64,
    /// 巡线解释
    pub line_interpreter: f64,
    /// 障碍物判定
    pub obstacle_interpreter: f64,
    /// 转向控制
    pub controller: f64,
    /// 执行
    pub actuation: f64,
}

impl Default for StageDelays {
    fn default() -> Self {
        Self {
            line_sensor: 0.1,
            obstacle_sensor: 0.1,
            line_interpreter: 0.1,
            obstacle_interpreter: 0.1,
            controller: 0.1,
            actuation: 0.1,
        }
    }
}

impl StageDelays {
    /// 所有阶段使用同一个节奏
    pub fn uniform(seconds: f64) -> Self {
        Self {
            line_sensor: seconds,
            obstacle_sensor: seconds,
            line_interpreter: seconds,
            obstacle_interpreter: seconds,
            controller: seconds,
            actuation: seconds,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("line_sensor", self.line_sensor),
            ("obstacle_sensor", self.obstacle_sensor),
            ("line_interpreter", self.line_interpreter),
            ("obstacle_interpreter", self.obstacle_interpreter),
            ("controller", self.controller),
            ("actuation", self.actuation),
        ]
    }

    /// 最大节奏
    pub fn max(&self) -> Duration {
        self.entries()
            .into_iter()
            .map(|(_, s)| seconds(s))
            .max()
            .unwrap_or_default()
    }
}

/// 巡线管线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// 低阈值（轻微转向）
    pub low_threshold: f64,
    /// 高阈值（急转 / 直行），可为 `inf`
    pub high_threshold: f64,
    /// 线极性：-1 深色线浅色底，+1 浅色线深色底
    pub polarity: i8,
    /// 灰度读数归一化方式
    pub normalization: Normalization,
    /// 障碍物距离阈值（与测距单位一致，通常为 cm）
    pub obstacle_threshold: f64,
    /// 转向比例（度 / 单位方向）
    pub scale: f64,
    /// 行驶速度
    pub speed: f64,
    /// 最大转向角（度）
    pub max_steering_angle: f64,
    /// 各阶段节奏
    pub delays: StageDelays,
    /// 定时器检查间隔（秒）
    pub timer_poll_delay: f64,
    /// 运行时长（秒），0 表示直到外部终止
    pub terminate_after: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            low_threshold: 0.35,
            high_threshold: 0.8,
            polarity: -1,
            normalization: Normalization::Mean,
            obstacle_threshold: 15.0,
            scale: 30.0,
            speed: 22.0,
            max_steering_angle: 30.0,
            delays: StageDelays::default(),
            timer_poll_delay: 0.01,
            terminate_after: 60.0,
        }
    }
}

impl PipelineConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验所有参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds().is_valid() {
            return Err(ConfigError::InvalidThresholds {
                low: self.low_threshold,
                high: self.high_threshold,
            });
        }

        self.polarity()?;

        if !(self.obstacle_threshold.is_finite() && self.obstacle_threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.obstacle_threshold));
        }

        for (field, value) in [
            ("scale", self.scale),
            ("speed", self.speed),
            ("max_steering_angle", self.max_steering_angle),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { field, value });
            }
        }

        for (stage, s) in self.delays.entries() {
            if !(s >= 0.0 && s.is_finite()) {
                return Err(ConfigError::NegativeDelay { stage, seconds: s });
            }
        }

        for (field, s) in [
            ("timer_poll_delay", self.timer_poll_delay),
            ("terminate_after", self.terminate_after),
        ] {
            if !(s >= 0.0 && s.is_finite()) {
                return Err(ConfigError::InvalidDuration { field, seconds: s });
            }
        }

        Ok(())
    }

    /// 分类阈值
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.low_threshold, self.high_threshold)
    }

    /// 线极性
    pub fn polarity(&self) -> Result<Polarity, ConfigError> {
        Ok(Polarity::try_from(self.polarity)?)
    }

    /// 运行时长；`None` 表示直到外部终止
    pub fn terminate_after(&self) -> Option<Duration> {
        let d = seconds(self.terminate_after);
        (!d.is_zero()).then_some(d)
    }

    /// 定时器检查间隔
    pub fn timer_poll_delay(&self) -> Duration {
        seconds(self.timer_poll_delay)
    }

    /// 链式设置运行时长（秒）
    pub fn with_terminate_after(mut self, seconds: f64) -> Self {
        self.terminate_after = seconds;
        self
    }

    /// 链式设置所有阶段节奏（秒）
    pub fn with_uniform_delay(mut self, seconds: f64) -> Self {
        self.delays = StageDelays::uniform(seconds);
        self
    }
}

/// 秒 → `Duration`；非法值按 0 处理（调用方应先校验）
pub(crate) fn seconds(s: f64) -> Duration {
    Duration::try_from_secs_f64(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.thresholds(), Thresholds::new(0.35, 0.8));
        assert_eq!(config.polarity().unwrap(), Polarity::DarkLine);
        assert_eq!(config.obstacle_threshold, 15.0);
        assert_eq!(config.scale, 30.0);
        assert_eq!(config.speed, 22.0);
        assert!((config.delays.max().as_secs_f64() - 0.1).abs() < 1e-9);
        assert!((config.timer_poll_delay().as_secs_f64() - 0.01).abs() < 1e-9);
        assert_eq!(config.terminate_after(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            polarity = 1
            normalization = "z_score"
            terminate_after = 0

            [delays]
            actuation = 0.15
            "#,
        )
        .unwrap();
        assert_eq!(config.polarity().unwrap(), Polarity::LightLine);
        assert_eq!(config.normalization, Normalization::ZScore);
        assert_eq!(config.terminate_after(), None);
        assert_eq!(config.delays.actuation, 0.15);
        assert_eq!(config.delays.line_sensor, 0.1);
        assert_eq!(config.low_threshold, 0.35);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = PipelineConfig {
            low_threshold: 0.9,
            high_threshold: 0.8,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));

        let config = PipelineConfig {
            low_threshold: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_unbounded_high_threshold() {
        // 高阈值为无穷时 Straight 与急转规则永不匹配，只剩轻微转向
        let config = PipelineConfig::from_toml_str("high_threshold = inf").unwrap();
        assert_eq!(config.high_threshold, f64::INFINITY);
        assert!(config.thresholds().is_valid());

        let config = PipelineConfig {
            high_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn test_invalid_polarity() {
        let err = PipelineConfig::from_toml_str("polarity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolarity(0)));
    }

    #[test]
    fn test_negative_delay_names_stage() {
        let config = PipelineConfig {
            delays: StageDelays {
                controller: -0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::NegativeDelay { stage, seconds }) => {
                assert_eq!(stage, "controller");
                assert_eq!(seconds, -0.1);
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_obstacle_threshold_and_durations() {
        let config = PipelineConfig {
            obstacle_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));

        let config = PipelineConfig::default().with_terminate_after(f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration {
                field: "terminate_after",
                ..
            })
        ));

        let config = PipelineConfig {
            speed: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { field: "speed", .. })
        ));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = PipelineConfig::from_toml_str("sped = 22").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_serialize_round_trip_through_toml() {
        let config = PipelineConfig::default().with_uniform_delay(0.05);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }
}
