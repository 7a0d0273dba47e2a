use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use orbitsolver::{
    daily_grid, evolve, initial_step, OrbitParameters, PhaseIntegrator, PhysicalSystem,
    SolverKind,
};

fn bench_sun_earth_one_year(c: &mut Criterion) {
    let times = daily_grid(365);
    let system = PhysicalSystem::sun_earth();

    c.bench_function("sun_earth_one_year", |b| {
        b.iter(|| {
            let mut phi = Vec::with_capacity(times.len());
            evolve(
                &mut phi,
                black_box(&times),
                system.mass,
                system.semi_major_axis,
                system.eccentricity,
                0.0,
                SolverKind::Rkf45,
            )
            .unwrap();
            phi
        })
    });
}

fn bench_eccentric_phase_grid(c: &mut Criterion) {
    let params = OrbitParameters::new(0.7, 0.3, 0.0);
    let times: Vec<f64> = (0..=1000).map(|i| i as f64 * 0.01).collect();

    c.bench_function("eccentric_phase_grid_1000", |b| {
        b.iter(|| {
            let mut integrator = PhaseIntegrator::new(params);
            integrator.advance(black_box(&times)).unwrap()
        })
    });
}

fn bench_initial_step(c: &mut Criterion) {
    let params = OrbitParameters::new(0.0167, 0.0, 1.0);

    c.bench_function("initial_step", |b| {
        b.iter(|| initial_step(black_box(1.0), 1e-8, 1e-8, |phi| params.phase_rate(phi)))
    });
}

criterion_group!(
    benches,
    bench_sun_earth_one_year,
    bench_eccentric_phase_grid,
    bench_initial_step
);
criterion_main!(benches);
