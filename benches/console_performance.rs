use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use robot_console::{
    Cell, Selection, TelemetryMessage, TelemetrySnapshot,
    config::GridConfig,
    render::MapRenderer,
    session::PathStore,
};
use serde_json::json;
use std::time::Duration;

fn create_sample_message(frame_size: usize) -> String {
    let frame: Vec<u8> = (0..frame_size).map(|i| (i % 251) as u8).collect();
    json!({
        "image": BASE64.encode(frame),
        "detections": [
            {"label": "person", "confidence": 0.91, "x1": 12, "y1": 40, "x2": 120, "y2": 300},
            {"label": "chair", "confidence": 0.55, "x1": 200, "y1": 180, "x2": 310, "y2": 330}
        ],
        "ultrasonic_distance": 87.5
    })
    .to_string()
}

fn bench_map_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_render");

    let renderer = MapRenderer::default();
    let grid = GridConfig::default().build();
    let selection = Selection::BothChosen {
        start: Cell::new(2, 2),
        end: Cell::new(2, 5),
    };
    let mut path = PathStore::default();
    path.replace(vec![Cell::new(2, 2), Cell::new(2, 3), Cell::new(2, 5)]);

    group.bench_function("render_default_grid", |b| {
        b.iter(|| black_box(renderer.render(&grid, &path, &selection)));
    });

    let large = GridConfig {
        rows: 100,
        cols: 100,
        cell_size_px: 8.,
        obstacles: (0..100).map(|i| Cell::new(i, (i * 7) % 100)).collect(),
    }
    .build();
    let mut long_path = PathStore::default();
    long_path.replace((0..100).map(|col| Cell::new(50, col)).collect());

    group.bench_function("render_100x100_grid", |b| {
        b.iter(|| black_box(renderer.render(&large, &long_path, &selection)));
    });

    group.finish();
}

fn bench_telemetry_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("telemetry_decode");

    let small = create_sample_message(4 * 1024);
    group.bench_function("decode_4k_frame", |b| {
        b.iter(|| black_box(TelemetryMessage::decode(&small).unwrap()));
    });

    let large = create_sample_message(120 * 1024);
    group.bench_function("decode_120k_frame", |b| {
        b.iter(|| black_box(TelemetryMessage::decode(&large).unwrap()));
    });

    let message = TelemetryMessage::decode(&large).unwrap();
    group.bench_function("apply_to_snapshot", |b| {
        let mut snapshot = TelemetrySnapshot::default();
        b.iter(|| snapshot.apply(black_box(message.clone())));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_map_render, bench_telemetry_decode
}
criterion_main!(benches);
