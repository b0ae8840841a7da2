use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use geo_types::{point, polygon};
use maskmatch::{
    resolve, Feature, FeatureId, FuzzyAreaMatcher, FuzzyConfig, HitRegistry, MaskIndex,
    MatchRegistrar, RegistrarConfig,
};

const SIDE: usize = 100;

fn buildings() -> MaskIndex {
    let masks = (0..SIDE * SIDE)
        .map(|i| {
            let x = (i % SIDE) as f64 * 10.0;
            let y = (i / SIDE) as f64 * 10.0;
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
        .collect();
    MaskIndex::build(masks).expect("index")
}

/// Address points: most inside a footprint, some in the gaps between them.
fn addresses(count: usize) -> Vec<Feature> {
    (0..count)
        .map(|i| {
            let cell = (i * 7919) % (SIDE * SIDE);
            let x = (cell % SIDE) as f64 * 10.0 + (i % 10) as f64;
            let y = (cell / SIDE) as f64 * 10.0 + 4.0;
            Feature::new(FeatureId::new(i as u64), point!(x: x, y: y))
        })
        .collect()
}

fn registration_bench(c: &mut Criterion) {
    let index = buildings();
    let registrar = MatchRegistrar::new(RegistrarConfig::planar(3.0)).expect("registrar");
    let mut group = c.benchmark_group("registration");

    for count in [1_000, 10_000] {
        let targets = addresses(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("register_and_resolve_{count}"), |b| {
            b.iter(|| {
                let mut registry = HitRegistry::for_index(&index);
                for target in targets.iter().cloned() {
                    registrar
                        .register(&index, &mut registry, target)
                        .expect("register");
                }
                let resolution = resolve(&index, &mut registry).expect("resolve");
                black_box((resolution, registry.uniques().len()));
            });
        });
    }

    group.finish();
}

fn fuzzy_bench(c: &mut Criterion) {
    let index = buildings();
    let matcher = FuzzyAreaMatcher::new(FuzzyConfig {
        tolerance: 0.01,
        assume_full_coverage: false,
    })
    .expect("matcher");
    let redrawn = Feature::new(
        FeatureId::new(0),
        polygon![
            (x: 500.05, y: 500.0),
            (x: 508.05, y: 500.0),
            (x: 508.05, y: 508.0),
            (x: 500.05, y: 508.0),
        ],
    );

    c.bench_function("fuzzy_find", |b| {
        b.iter(|| {
            let found = matcher.find(&index, black_box(&redrawn)).expect("find");
            black_box(found.map(|m| m.slot));
        });
    });
}

criterion_group!(benches, registration_bench, fuzzy_bench);
criterion_main!(benches);
