//! 日志初始化
//!
//! 库代码只通过 `tracing` 宏记录日志；宿主程序调用 [`init_logging`] 安装订阅者。
//! `RUST_LOG` 优先，未设置时本 workspace 的 crate 默认 `info` 级别。
//! 使用 `log` crate 的协作方（传感器 / 电机驱动）经 `tracing-log` 桥接进来。

use tracing::warn;
use tracing_subscriber::EnvFilter;

/// 默认日志级别指令
const DEFAULT_DIRECTIVES: &[&str] = &[
    "picar_bus=info",
    "picar_sense=info",
    "picar_control=info",
    "picar_sdk=info",
];

/// 构建日志过滤器：`RUST_LOG` 有效时直接使用，否则使用默认指令
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        DEFAULT_DIRECTIVES
            .iter()
            .filter_map(|d| d.parse().ok())
            .fold(EnvFilter::new("warn"), |filter, directive| {
                filter.add_directive(directive)
            })
    })
}

/// 安装全局日志订阅者与 `log` 桥接
///
/// 可以重复调用；返回 `true` 表示本次调用完成了订阅者安装。
/// 宿主已经设置了自己的 `log` 记录器时，桥接安装失败只记一条警告。
pub fn init_logging() -> bool {
    if tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .is_err()
    {
        return false;
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        warn!("`log` records will not reach tracing: {}", e);
    }
    true
}
