use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hyperloglog_storage::{Hll, Settings};
use rand::Rng;

fn bench_add_raw_full(c: &mut Criterion) {
    let settings = Settings::new(11, 5, 0, false).unwrap();
    let mut rng = rand::rng();
    let values: Vec<u64> = (0..10_000).map(|_| rng.random()).collect();

    c.bench_function("add_raw (full)", |b| {
        b.iter(|| {
            let mut hll = Hll::new(settings);
            for v in &values {
                hll.add_raw(black_box(*v));
            }
        });
    });
}

fn bench_add_raw_sparse(c: &mut Criterion) {
    let settings = Settings::new(11, 5, 0, true).unwrap();
    let mut rng = rand::rng();
    let values: Vec<u64> = (0..1_000).map(|_| rng.random()).collect();

    c.bench_function("add_raw (sparse)", |b| {
        b.iter(|| {
            let mut hll = Hll::new(settings);
            for v in &values {
                hll.add_raw(black_box(*v));
            }
        });
    });
}

fn bench_cardinality(c: &mut Criterion) {
    let settings = Settings::new(11, 5, 0, false).unwrap();
    let mut rng = rand::rng();
    let mut hll = Hll::new(settings);
    for _ in 0..50_000 {
        hll.add_raw(rng.random());
    }

    c.bench_function("cardinality (full, 50k distinct)", |b| {
        b.iter(|| black_box(hll.cardinality()));
    });
}

fn bench_to_bytes(c: &mut Criterion) {
    let settings = Settings::new(11, 5, 0, false).unwrap();
    let mut rng = rand::rng();
    let mut hll = Hll::new(settings);
    for _ in 0..50_000 {
        hll.add_raw(rng.random());
    }

    c.bench_function("to_bytes (full, 50k distinct)", |b| {
        b.iter(|| black_box(hll.to_bytes()));
    });
}

criterion_group!(benches, bench_add_raw_full, bench_add_raw_sparse, bench_cardinality, bench_to_bytes);
criterion_main!(benches);
