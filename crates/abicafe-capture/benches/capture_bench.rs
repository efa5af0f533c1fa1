//! Capture overhead benchmarks.
//!
//! Measures the cost of recording one full six-argument call through the
//! scoped primitives into each sink.

use std::time::Duration;

use abicafe_capture::{
    BufferId, CallCapture, CaptureOptions, StreamSink, capture_scope, finish_call, record_value,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const WIDE: i128 = 0x2222_2222_2222_2222_1111_1111_1111_1111;

fn record_six_args() {
    for buffer in [BufferId::CallerInputs, BufferId::CalleeInputs] {
        record_value(buffer, &black_box(WIDE));
        record_value(buffer, &black_box(WIDE));
        record_value(buffer, &black_box(1234.456f32));
        record_value(buffer, &black_box(WIDE));
        record_value(buffer, &black_box(235u8));
        record_value(buffer, &black_box(WIDE));
    }
    record_value(BufferId::CalleeOutputs, &black_box(WIDE));
    finish_call(BufferId::CalleeInputs, BufferId::CalleeOutputs);
    record_value(BufferId::CallerOutputs, &black_box(WIDE));
    finish_call(BufferId::CallerInputs, BufferId::CallerOutputs);
}

fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("six_args", "memory"), |b| {
        b.iter(|| {
            let mut cap = CallCapture::new();
            let _ = capture_scope(&mut cap, CaptureOptions::default(), record_six_args);
            black_box(cap.finish())
        });
    });

    group.bench_function(BenchmarkId::new("six_args", "stream"), |b| {
        b.iter(|| {
            let mut sink = StreamSink::new(Vec::with_capacity(2048));
            let _ = capture_scope(&mut sink, CaptureOptions::default(), record_six_args);
            black_box(sink.events())
        });
    });

    group.bench_function(BenchmarkId::new("six_args", "no_scope"), |b| {
        b.iter(record_six_args);
    });

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(2))
        .sample_size(100);
    targets = bench_capture
);
criterion_main!(benches);
