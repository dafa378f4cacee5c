//! 总线层错误类型定义

use thiserror::Error;

/// 阶段函数返回的致命错误（类型擦除）
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 调度器错误类型
#[derive(Error, Debug)]
pub enum BusError {
    /// 阶段函数返回了致命错误（例如执行器故障）
    #[error("Stage `{stage}` failed: {source}")]
    StageFailed {
        /// 阶段名称
        stage: String,
        /// 原始错误
        #[source]
        source: StageError,
    },

    /// 阶段线程 panic
    #[error("Stage `{stage}` panicked: {message}")]
    StagePanicked {
        /// 阶段名称
        stage: String,
        /// panic 信息
        message: String,
    },

    /// 启动阶段线程失败
    #[error("Failed to spawn stage `{stage}`: {source}")]
    Spawn {
        /// 阶段名称
        stage: String,
        /// IO 错误
        #[source]
        source: std::io::Error,
    },
}

impl BusError {
    /// 出错的阶段名称
    pub fn stage(&self) -> &str {
        match self {
            BusError::StageFailed { stage, .. }
            | BusError::StagePanicked { stage, .. }
            | BusError::Spawn { stage, .. } => stage,
        }
    }

    /// 把阶段错误还原成具体类型
    ///
    /// ```
    /// # use picar_bus::BusError;
    /// let err = BusError::StageFailed {
    ///     stage: "actuation".into(),
    ///     source: Box::new(std::fmt::Error),
    /// };
    /// assert!(err.downcast_source::<std::fmt::Error>().is_some());
    /// ```
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            BusError::StageFailed { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
