//! 管线热路径基准测试
//!
//! 邮箱读写与方向分类每个周期都会执行，应保持在亚微秒级。

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use picar_sdk::bus::Mailbox;
use picar_sdk::sense::{
    DirectionClassifier, Normalization, Polarity, Reading, SensorReading, Thresholds, normalize,
};
use std::sync::Arc;
use std::thread;

fn bench_mailbox_write(c: &mut Criterion) {
    let bus = Mailbox::new("bench");
    c.bench_function("mailbox_write", |b| {
        b.iter(|| bus.write(black_box(15.0f64)));
    });
}

fn bench_mailbox_read(c: &mut Criterion) {
    let bus = Mailbox::with_initial("bench", Reading::Distance(42.0));
    c.bench_function("mailbox_read", |b| {
        b.iter(|| black_box(bus.read()));
    });
}

fn bench_mailbox_read_contended(c: &mut Criterion) {
    let bus = Arc::new(Mailbox::with_initial("bench", [0.0f64; 3]));
    let writer_bus = Arc::clone(&bus);
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let writer_stop = Arc::clone(&stop);
    let writer = thread::spawn(move || {
        let mut i = 0.0;
        while !writer_stop.load(std::sync::atomic::Ordering::Relaxed) {
            writer_bus.write([i, i, i]);
            i += 1.0;
        }
    });

    c.bench_function("mailbox_read_contended", |b| {
        b.iter(|| black_box(bus.read()));
    });

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    let _ = writer.join();
}

fn bench_normalize_and_classify(c: &mut Criterion) {
    let mut classifier = DirectionClassifier::new(Thresholds::default(), Polarity::DarkLine);
    c.bench_function("normalize_and_classify", |b| {
        b.iter(|| {
            let reading: SensorReading =
                normalize(black_box([40.0, 10.0, 40.0]), Normalization::Mean).unwrap_or_default();
            black_box(classifier.classify(&reading))
        });
    });
}

criterion_group!(
    benches,
    bench_mailbox_write,
    bench_mailbox_read,
    bench_mailbox_read_contended,
    bench_normalize_and_classify
);
criterion_main!(benches);
