//! 脚本化的模拟传感器
//!
//! 用于测试和演示，不依赖任何硬件。每个模拟传感器按顺序回放脚本，
//! 脚本放完后一直重复最后一个值。通过 [`ScriptHandle`] 可以在其他线程里
//! 改写场景（例如让障碍物突然出现）或注入一次读取失败。

use crate::error::SensorFault;
use crate::source::{GrayscaleAdc, LineCamera, Rangefinder};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug)]
struct ScriptState<T> {
    pending: VecDeque<T>,
    current: Option<T>,
    fail_next: Option<String>,
    reads: u64,
}

/// 模拟传感器的共享控制句柄
#[derive(Debug)]
pub struct ScriptHandle<T> {
    state: Arc<Mutex<ScriptState<T>>>,
}

impl<T> Clone for ScriptHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone> ScriptHandle<T> {
    fn new(script: Vec<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                pending: script.into(),
                current: None,
                fail_next: None,
                reads: 0,
            })),
        }
    }

    /// 丢弃剩余脚本，从下一次读取开始固定返回 `value`
    pub fn set(&self, value: T) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.current = Some(value);
    }

    /// 在脚本末尾追加一个值
    pub fn push(&self, value: T) {
        self.state.lock().pending.push_back(value);
    }

    /// 下一次读取返回设备错误
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// 已发生的读取次数（含失败）
    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }

    fn next(&self) -> Result<T, SensorFault> {
        let mut state = self.state.lock();
        state.reads += 1;
        if let Some(message) = state.fail_next.take() {
            return Err(SensorFault::Device(message));
        }
        if let Some(value) = state.pending.pop_front() {
            state.current = Some(value);
        }
        state
            .current
            .clone()
            .ok_or_else(|| SensorFault::Device("empty sensor script".to_string()))
    }
}

/// 模拟灰度模块
#[derive(Debug, Clone)]
pub struct ScriptedGrayscale {
    handle: ScriptHandle<[f64; 3]>,
}

impl ScriptedGrayscale {
    /// 按顺序回放三路原始值
    pub fn new(script: Vec<[f64; 3]>) -> Self {
        Self {
            handle: ScriptHandle::new(script),
        }
    }

    /// 控制句柄
    pub fn handle(&self) -> ScriptHandle<[f64; 3]> {
        self.handle.clone()
    }
}

impl GrayscaleAdc for ScriptedGrayscale {
    fn read_raw(&mut self) -> Result<[f64; 3], SensorFault> {
        self.handle.next()
    }
}

/// 模拟超声波模块
#[derive(Debug, Clone)]
pub struct ScriptedRangefinder {
    handle: ScriptHandle<f64>,
}

impl ScriptedRangefinder {
    /// 按顺序回放距离（cm）
    pub fn new(script: Vec<f64>) -> Self {
        Self {
            handle: ScriptHandle::new(script),
        }
    }

    /// 控制句柄
    pub fn handle(&self) -> ScriptHandle<f64> {
        self.handle.clone()
    }
}

impl Rangefinder for ScriptedRangefinder {
    fn read_distance(&mut self) -> Result<f64, SensorFault> {
        self.handle.next()
    }
}

/// 模拟巡线摄像头
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    handle: ScriptHandle<Option<f64>>,
}

impl ScriptedCamera {
    /// 按顺序回放线偏移
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            handle: ScriptHandle::new(script),
        }
    }

    /// 控制句柄
    pub fn handle(&self) -> ScriptHandle<Option<f64>> {
        self.handle.clone()
    }
}

impl LineCamera for ScriptedCamera {
    fn line_offset(&mut self) -> Result<Option<f64>, SensorFault> {
        self.handle.next()
    }
}
