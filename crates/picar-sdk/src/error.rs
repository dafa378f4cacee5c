//! 管线层错误类型定义

use crate::config::ConfigError;
use picar_bus::BusError;
use picar_control::ActuatorFault;
use picar_sense::SourceKind;
use thiserror::Error;

/// 管线错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 配置不合法（构建期）
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 运行期阶段失败（执行器故障、panic、线程创建失败）
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// 同步循环中执行器故障
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorFault),

    /// 缺少必需的协作方
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// 传感源类型与用途不符
    #[error("{role} cannot use a {kind:?} source")]
    SourceMismatch {
        /// 用途
        role: &'static str,
        /// 实际传感源类型
        kind: SourceKind,
    },
}

impl PipelineError {
    /// 导致失败的执行器故障（如果有）
    pub fn actuator_fault(&self) -> Option<&ActuatorFault> {
        match self {
            PipelineError::Actuator(fault) => Some(fault),
            PipelineError::Bus(e) => e.downcast_source::<ActuatorFault>(),
            _ => None,
        }
    }
}
