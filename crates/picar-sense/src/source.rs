//! 传感源
//!
//! 硬件访问属于外部协作方，这里只定义它们需要实现的窄接口：
//! - [`GrayscaleAdc`]：三路灰度 ADC 原始值
//! - [`Rangefinder`]：超声波测距（无回波时返回非正值）
//! - [`LineCamera`]：视觉模块给出的线偏移
//!
//! [`SensorSource`] 是三者的带标签联合，在构造时选定一次，之后每个周期只调用 `read()`。

use crate::error::SensorFault;
use crate::reading::{Normalization, Reading, normalize};
use tracing::trace;

/// 三路灰度 ADC
pub trait GrayscaleAdc: Send {
    /// 读取左、中、右三路原始值
    fn read_raw(&mut self) -> Result<[f64; 3], SensorFault>;
}

/// 超声波测距模块
pub trait Rangefinder: Send {
    /// 读取距离（cm）；没有回波时返回非正值
    fn read_distance(&mut self) -> Result<f64, SensorFault>;
}

/// 巡线摄像头（图像处理在外部完成）
pub trait LineCamera: Send {
    /// 线相对画面中心的偏移，左负右正；本帧没有检测到线时返回 `None`
    fn line_offset(&mut self) -> Result<Option<f64>, SensorFault>;
}

/// 传感源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// 灰度模块
    Grayscale,
    /// 摄像头
    Camera,
    /// 超声波
    Ultrasonic,
}

/// 传感源（带标签联合）
pub enum SensorSource {
    /// 灰度模块 + 归一化模式
    Grayscale {
        /// ADC 协作方
        adc: Box<dyn GrayscaleAdc>,
        /// 归一化模式
        normalization: Normalization,
    },
    /// 摄像头
    Camera(Box<dyn LineCamera>),
    /// 超声波
    Ultrasonic(Box<dyn Rangefinder>),
}

impl SensorSource {
    /// 灰度传感源
    pub fn grayscale(adc: impl GrayscaleAdc + 'static, normalization: Normalization) -> Self {
        SensorSource::Grayscale {
            adc: Box::new(adc),
            normalization,
        }
    }

    /// 摄像头传感源
    pub fn camera(camera: impl LineCamera + 'static) -> Self {
        SensorSource::Camera(Box::new(camera))
    }

    /// 超声波传感源
    pub fn ultrasonic(rangefinder: impl Rangefinder + 'static) -> Self {
        SensorSource::Ultrasonic(Box::new(rangefinder))
    }

    /// 类型标签
    pub fn kind(&self) -> SourceKind {
        match self {
            SensorSource::Grayscale { .. } => SourceKind::Grayscale,
            SensorSource::Camera(_) => SourceKind::Camera,
            SensorSource::Ultrasonic(_) => SourceKind::Ultrasonic,
        }
    }

    /// 产生一次读数
    pub fn read(&mut self) -> Result<Reading, SensorFault> {
        let reading = match self {
            SensorSource::Grayscale { adc, normalization } => {
                let raw = adc.read_raw()?;
                Reading::Proximity(normalize(raw, *normalization)?)
            },
            SensorSource::Camera(camera) => Reading::LineOffset(camera.line_offset()?),
            SensorSource::Ultrasonic(rangefinder) => {
                Reading::Distance(rangefinder.read_distance()?)
            },
        };
        trace!("{:?} reading: {:?}", self.kind(), reading);
        Ok(reading)
    }
}

impl std::fmt::Debug for SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorSource::Grayscale { normalization, .. } => f
                .debug_struct("Grayscale")
                .field("normalization", normalization)
                .finish_non_exhaustive(),
            SensorSource::Camera(_) => f.write_str("Camera"),
            SensorSource::Ultrasonic(_) => f.write_str("Ultrasonic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorReading;
    use crate::sim::{ScriptedCamera, ScriptedGrayscale, ScriptedRangefinder};

    #[test]
    fn test_grayscale_source_normalizes() {
        let mut source = SensorSource::grayscale(
            ScriptedGrayscale::new(vec![[10.0, 50.0, 12.0]]),
            Normalization::Mean,
        );
        assert_eq!(source.kind(), SourceKind::Grayscale);
        match source.read().unwrap() {
            Reading::Proximity(SensorReading([a, b, c])) => {
                assert!((a - 0.4167).abs() < 1e-4);
                assert!((b - 2.0833).abs() < 1e-4);
                assert!((c - 0.5).abs() < 1e-4);
            },
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn test_camera_and_ultrasonic_sources() {
        let mut camera = SensorSource::camera(ScriptedCamera::new(vec![Some(0.4), None]));
        assert_eq!(camera.read().unwrap(), Reading::LineOffset(Some(0.4)));
        assert_eq!(camera.read().unwrap(), Reading::LineOffset(None));

        let mut ultra = SensorSource::ultrasonic(ScriptedRangefinder::new(vec![-1.0, 8.0]));
        assert_eq!(ultra.kind(), SourceKind::Ultrasonic);
        assert_eq!(ultra.read().unwrap(), Reading::Distance(-1.0));
        assert_eq!(ultra.read().unwrap(), Reading::Distance(8.0));
    }

    #[test]
    fn test_device_fault_propagates() {
        let adc = ScriptedGrayscale::new(vec![[1.0, 1.0, 1.0]]);
        adc.handle().fail_next("ADC disconnected");
        let mut source = SensorSource::grayscale(adc, Normalization::Mean);
        assert_eq!(
            source.read().unwrap_err(),
            SensorFault::Device("ADC disconnected".to_string())
        );
        assert!(source.read().is_ok());
    }
}
