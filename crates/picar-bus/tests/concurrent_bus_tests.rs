//! 总线并发测试
//!
//! 在真实线程上验证邮箱的新鲜度与完整性，以及终止信号的有界退出。

use picar_bus::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 读者永远看不到撕裂的值，且看到的序号不会倒退
#[test]
fn test_mailbox_concurrent_read_never_torn() {
    let bus = Arc::new(Mailbox::new("triple"));
    let writes = 5_000u64;
    let num_readers = 8;

    let writer_bus = Arc::clone(&bus);
    let writer = thread::spawn(move || {
        for i in 1..=writes {
            let v = i as f64;
            writer_bus.write((i, [v, v, v]));
            thread::yield_now();
        }
    });

    let readers: Vec<_> = (0..num_readers)
        .map(|_| {
            let reader_bus = Arc::clone(&bus);
            thread::spawn(move || {
                let mut last_seq = 0u64;
                loop {
                    if let Some((seq, values)) = reader_bus.read() {
                        let v = seq as f64;
                        assert_eq!(values, [v, v, v]);
                        assert!(seq >= last_seq);
                        last_seq = seq;
                        if seq == writes {
                            break;
                        }
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(bus.metrics().writes, writes);
}

/// 读者在写者完成后看到的一定是最后一次写入
#[test]
fn test_mailbox_freshness_after_writer_done() {
    let bus = Arc::new(Mailbox::new("fresh"));
    let writer_bus = Arc::clone(&bus);
    thread::spawn(move || {
        for i in 0..1_000 {
            writer_bus.write(i);
        }
    })
    .join()
    .unwrap();
    assert_eq!(bus.read(), Some(999));
}

/// 慢消费者只看到部分写入，被覆盖的写入计入 `overwritten`
#[test]
fn test_slow_consumer_skips_intermediate_values() {
    let signal = TerminationSignal::new();
    let raw = Arc::new(Mailbox::new("raw"));
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut n = 0u64;
    let sink = Arc::clone(&seen);
    let report = Scheduler::new(signal.clone())
        .with_stage(Producer::new(
            "fast producer",
            move || {
                n += 1;
                Ok::<_, std::fmt::Error>(n)
            },
            Arc::clone(&raw),
            Duration::from_millis(1),
            signal.clone(),
        ))
        .with_stage(Consumer::new(
            "slow consumer",
            move |v: Option<u64>| -> Result<(), std::fmt::Error> {
                if let Some(v) = v {
                    sink.lock().push(v);
                }
                Ok(())
            },
            Arc::clone(&raw),
            Duration::from_millis(10),
            signal.clone(),
        ))
        .with_stage(Timer::new(
            "timer",
            Duration::from_millis(150),
            Duration::from_millis(1),
            signal.clone(),
        ))
        .run()
        .unwrap();

    let seen = seen.lock();
    assert!(!seen.is_empty());
    // 读到的序号单调不减
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));

    let producer = report.stage("fast producer").unwrap();
    let consumer = report.stage("slow consumer").unwrap();
    assert!(producer.metrics.cycles > consumer.metrics.cycles);
    assert!(raw.metrics().overwritten > 0);
}

/// 单写者单读者并发时，`overwritten` 恰好等于读者从未见到的写入数
#[test]
fn test_overwritten_matches_values_never_read() {
    let bus = Arc::new(Mailbox::new("contended"));
    let writes = 20_000u64;
    let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let writer_bus = Arc::clone(&bus);
    let writer_done = Arc::clone(&done);
    let writer = thread::spawn(move || {
        for i in 1..=writes {
            writer_bus.write(i);
            if i % 64 == 0 {
                thread::yield_now();
            }
        }
        writer_done.store(true, std::sync::atomic::Ordering::Release);
    });

    let reader_bus = Arc::clone(&bus);
    let reader_done = Arc::clone(&done);
    let reader = thread::spawn(move || {
        let mut distinct = 0u64;
        let mut last = 0u64;
        let mut reads = 0u64;
        loop {
            let finished = reader_done.load(std::sync::atomic::Ordering::Acquire);
            reads += 1;
            if let Some(v) = reader_bus.read() {
                assert!(v >= last);
                if v > last {
                    distinct += 1;
                    last = v;
                }
            }
            if finished {
                break;
            }
        }
        (distinct, reads)
    });

    writer.join().unwrap();
    let (distinct, reads) = reader.join().unwrap();

    let metrics = bus.metrics();
    assert_eq!(metrics.writes, writes);
    assert_eq!(metrics.reads, reads);
    // 写者结束后读者至少又读了一次，最后一个值一定被读到
    assert_eq!(metrics.overwritten, writes - distinct);
    assert!(metrics.overwritten < writes);
}

/// 终止信号置位后，各阶段在一个节奏内退出
#[test]
fn test_termination_is_bounded_by_cadence() {
    let signal = TerminationSignal::new();
    let cadence = Duration::from_millis(20);
    let bus = Arc::new(Mailbox::new("bounded"));

    let mut scheduler = Scheduler::new(signal.clone());
    for i in 0..4 {
        scheduler.add(Producer::new(
            format!("producer {i}"),
            move || Ok::<_, std::fmt::Error>(i),
            Arc::clone(&bus),
            cadence,
            signal.clone(),
        ));
    }

    let stopper = signal.clone();
    let stop_at = Arc::new(parking_lot::Mutex::new(None));
    let stop_at_writer = Arc::clone(&stop_at);
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        *stop_at_writer.lock() = Some(Instant::now());
        stopper.trigger();
    });

    let report = scheduler.run().unwrap();
    let returned = Instant::now();
    trigger.join().unwrap();

    let stop_at = stop_at.lock().unwrap();
    // 一个节奏加上调度余量
    assert!(returned.duration_since(stop_at) < cadence + Duration::from_millis(200));
    assert_eq!(report.stages.len(), 4);
    assert!(report.all_completed());
}

/// 定时器到时后整个运行结束，耗时不短于设定时长
#[test]
fn test_timer_ends_run() {
    let signal = TerminationSignal::new();
    let bus = Arc::new(Mailbox::new("angle"));
    let started = Instant::now();

    let report = Scheduler::new(signal.clone())
        .with_stage(Producer::new(
            "produce",
            || Ok::<_, std::fmt::Error>(0.0),
            Arc::clone(&bus),
            Duration::from_millis(10),
            signal.clone(),
        ))
        .with_stage(Timer::new(
            "Termination Timer",
            Duration::from_millis(200),
            Duration::from_millis(10),
            signal.clone(),
        ))
        .run()
        .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
    assert!(signal.is_triggered());
    assert!(report.elapsed >= Duration::from_millis(200));
    assert_eq!(
        report.stage("Termination Timer").unwrap().outcome,
        StageOutcome::Completed
    );
}

/// 零时长定时器不会自行结束运行
#[test]
fn test_zero_duration_timer_requires_host_stop() {
    let signal = TerminationSignal::new();
    let scheduler = Scheduler::new(signal.clone()).with_stage(Timer::new(
        "timer",
        Duration::ZERO,
        Duration::from_millis(1),
        signal.clone(),
    ));
    let handle = thread::spawn(move || scheduler.run());

    thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());
    assert!(!signal.is_triggered());

    signal.trigger();
    let report = handle.join().unwrap().unwrap();
    assert!(report.all_completed());
}

/// 定时器 panic 不会置位终止信号，运行由宿主结束
#[test]
fn test_timer_panic_does_not_terminate() {
    struct BrokenTimer {
        metrics: Arc<StageMetrics>,
    }

    impl Stage for BrokenTimer {
        fn name(&self) -> &str {
            "broken timer"
        }
        fn kind(&self) -> StageKind {
            StageKind::Timer
        }
        fn cadence(&self) -> Duration {
            Duration::from_millis(1)
        }
        fn metrics(&self) -> Arc<StageMetrics> {
            Arc::clone(&self.metrics)
        }
        fn run(self: Box<Self>) -> Result<(), StageError> {
            panic!("clock went backwards")
        }
    }

    let signal = TerminationSignal::new();
    let bus = Arc::new(Mailbox::new("value"));
    let mut scheduler = Scheduler::new(signal.clone());
    scheduler
        .add(BrokenTimer {
            metrics: Arc::new(StageMetrics::new()),
        })
        .add(Producer::new(
            "produce",
            || Ok::<_, std::fmt::Error>(1),
            Arc::clone(&bus),
            Duration::from_millis(1),
            signal.clone(),
        ));
    let handle = thread::spawn(move || scheduler.run());

    thread::sleep(Duration::from_millis(50));
    assert!(!signal.is_triggered());
    assert!(!handle.is_finished());

    signal.trigger();
    let report = handle.join().unwrap().unwrap();
    assert_eq!(
        report.stage("broken timer").unwrap().outcome,
        StageOutcome::Panicked("clock went backwards".to_string())
    );
    assert!(report.stage("produce").unwrap().outcome.is_completed());
}
