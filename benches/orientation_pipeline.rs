//! Benchmarks for the telemetry hot path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossbeam_channel::bounded;
use flexogear_rs::config::AppConfig;
use flexogear_rs::controller::SessionController;
use flexogear_rs::device::{decode_sample, encode_sample, ChannelSink};
use flexogear_rs::orientation::{Calibration, Orientation, QuaternionExt};
use flexogear_rs::session::MemoryStore;

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("telemetry_decode");
    let payload = encode_sample(&Orientation::from_wrist_angles(-32.5, 14.0));

    group.bench_function("well_formed", |b| {
        b.iter(|| decode_sample(black_box(&payload)))
    });
    group.bench_function("malformed", |b| {
        b.iter(|| decode_sample(black_box(b"0.1,0.2,nan-ish")))
    });

    group.finish();
}

fn bench_angles(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrist_angles");
    let mut calibration = Calibration::new();
    calibration.capture(Orientation::from_wrist_angles(12.0, -6.0));
    let sample = Orientation::from_wrist_angles(-20.0, 10.0);

    group.bench_function("to_wrist_angles", |b| {
        b.iter(|| black_box(&sample).to_wrist_angles())
    });
    group.bench_function("calibrated_angles", |b| {
        b.iter(|| calibration.apply(black_box(&sample)).to_wrist_angles())
    });

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_ingest");

    for size in [1usize, 16, 256].iter() {
        let payloads: Vec<Vec<u8>> = (0..*size)
            .map(|i| encode_sample(&Orientation::from_wrist_angles(-(i as f64 % 60.0), 0.0)))
            .collect();

        let (tx, _rx) = bounded(1024);
        let mut controller =
            SessionController::new(&AppConfig::default(), Box::new(MemoryStore::new()));
        if let Ok(attempt) = controller.begin_connect() {
            controller.on_connected(attempt, Box::new(ChannelSink::new(tx)));
        }

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("burst", size), &payloads, |b, payloads| {
            b.iter(|| controller.ingest_burst(payloads.iter().map(Vec::as_slice)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_angles, bench_ingest);
criterion_main!(benches);
