use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mcnaive::core::domain::Domain;
use mcnaive::core::estimators::{Updateable, WelfordEstimators};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn benchmark_welford_update(c: &mut Criterion) {
    let mut rng = Pcg64::seed_from_u64(0xcafe_f00d);
    let values: Vec<f64> = (0..4096).map(|_| rng.gen()).collect();

    c.bench_function("welford 4096 updates", |b| {
        b.iter(|| {
            let mut estimators = WelfordEstimators::new();
            for &value in &values {
                estimators.update(black_box(value));
            }
            estimators
        })
    });
}

fn benchmark_domain_transform(c: &mut Criterion) {
    let inf = f64::INFINITY;
    let domain = Domain::new(&[(0.0, 1.0), (0.0, inf), (-inf, inf)], true).unwrap();
    let mut rng = Pcg64::seed_from_u64(0xcafe_f00d);
    let points: Vec<[f64; 3]> = (0..4096).map(|_| rng.gen()).collect();

    c.bench_function("transform 4096 samples", |b| {
        b.iter(|| {
            points
                .iter()
                .map(|point| {
                    let mut x = *point;
                    domain.map_in_place(black_box(&mut x))
                })
                .sum::<f64>()
        })
    });
}

criterion_group!(benches, benchmark_welford_update, benchmark_domain_transform);
criterion_main!(benches);
