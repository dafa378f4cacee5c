//! 模拟巡线示例
//!
//! 无需硬件：灰度模块读数由一条缓慢漂移的线加噪声生成，超声波在中途模拟一次障碍物。
//! 按 Ctrl+C 提前结束，否则运行 `terminate_after` 秒。
//!
//! ```bash
//! RUST_LOG=picar_bus=debug cargo run -p picar-sdk --example simulated_line_follow [config.toml]
//! ```

use picar_sdk::prelude::*;
use picar_sdk::sense::{GrayscaleAdc, Rangefinder};
use picar_sdk::sim::SimulatedCar;
use rand::Rng;
use std::time::Instant;

/// 深色线在三路探头下方来回漂移
struct DriftingLine {
    started: Instant,
}

impl GrayscaleAdc for DriftingLine {
    fn read_raw(&mut self) -> Result<[f64; 3], SensorFault> {
        let t = self.started.elapsed().as_secs_f64();
        // 线中心位置：-1 左探头，0 中间，+1 右探头
        let center = (t * 0.8).sin();
        let mut rng = rand::thread_rng();
        let mut raw = [0.0; 3];
        for (i, value) in raw.iter_mut().enumerate() {
            let offset = i as f64 - 1.0;
            let darkness = (-(offset - center).powi(2) * 4.0).exp();
            *value = 60.0 - 45.0 * darkness + rng.gen_range(-2.0..2.0);
        }
        Ok(raw)
    }
}

/// 第 3~4 秒之间前方有障碍物，偶尔丢失回波
struct PassingObstacle {
    started: Instant,
}

impl Rangefinder for PassingObstacle {
    fn read_distance(&mut self) -> Result<f64, SensorFault> {
        let t = self.started.elapsed().as_secs_f64();
        if rand::thread_rng().gen_bool(0.05) {
            return Ok(-1.0);
        }
        Ok(if (3.0..4.0).contains(&t) { 8.0 } else { 120.0 })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    picar_sdk::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default().with_terminate_after(6.0),
    };

    let car = SimulatedCar::new();
    let log = car.handle();
    let started = Instant::now();

    let pipeline = LineFollowPipeline::builder(config)
        .grayscale(DriftingLine { started })
        .obstacle_source(SensorSource::ultrasonic(PassingObstacle { started }))
        .actuator(car)
        .build()?;

    // 设置 Ctrl+C 处理
    let signal = pipeline.termination();
    ctrlc::set_handler(move || {
        signal.trigger();
        println!("\n收到退出信号，正在停车...");
    })?;

    let buses = pipeline.buses();
    let report = pipeline.run()?;

    println!("运行时长: {:?}", report.elapsed());
    for stage in &report.run.stages {
        println!(
            "  {:<28} {:<18} cycles={:<5} faults={:<3} {:?}",
            stage.name,
            stage.kind.to_string(),
            stage.metrics.cycles,
            stage.metrics.faults,
            stage.outcome
        );
    }
    for (name, metrics) in &report.mailboxes {
        println!(
            "  {:<28} writes={:<5} reads={:<5} overwritten={}",
            name, metrics.writes, metrics.reads, metrics.overwritten
        );
    }
    println!("最后方向: {:?}", buses.direction.read());
    println!(
        "执行指令: {} 条，其中停车 {} 条",
        log.commands().len(),
        log.stop_count()
    );

    Ok(())
}
