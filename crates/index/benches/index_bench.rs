use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use geo::polygon;
use index::{BoundingBox, MaskIndex};
use ingest::{Feature, FeatureId};

/// A `side` x `side` grid of 8-unit footprints on a 10-unit pitch.
fn footprints(side: usize) -> Vec<Feature> {
    (0..side * side)
        .map(|i| {
            let x = (i % side) as f64 * 10.0;
            let y = (i / side) as f64 * 10.0;
            Feature::new(
                FeatureId::new(i as u64),
                polygon![
                    (x: x, y: y),
                    (x: x + 8.0, y: y),
                    (x: x + 8.0, y: y + 8.0),
                    (x: x, y: y + 8.0),
                ],
            )
        })
        .collect()
}

fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_index");

    for side in [10, 100, 300] {
        let masks = footprints(side);
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_function(format!("build_{}", side * side), |b| {
            b.iter(|| MaskIndex::build(black_box(masks.clone())).expect("build"))
        });
    }

    let index = MaskIndex::build(footprints(300)).expect("build");
    group.throughput(Throughput::Elements(1));
    group.bench_function("point_query", |b| {
        let probe = BoundingBox::new(1504.0, 1504.0, 1504.0, 1504.0);
        b.iter(|| index.query(black_box(&probe)))
    });
    group.bench_function("buffered_query", |b| {
        let probe = BoundingBox::new(1504.0, 1504.0, 1504.0, 1504.0).expand(3.0, 3.0);
        b.iter(|| index.query(black_box(&probe)))
    });

    group.finish();
}

criterion_group!(benches, bench_index);
criterion_main!(benches);
