use criterion::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use steadysol::prelude::models::{OneCompartment, TwoCompartments};
use steadysol::prelude::*;

fn bolus_one_compartment() {
    let regimen = DosingRegimen::bolus(1, 100.0, 24.0).unwrap();
    let solution = steady_state(
        &OneCompartment,
        &Dopri45::default(),
        &regimen,
        &[0.1],
        1,
        &NewtonSolver::default(),
    )
    .unwrap();
    black_box(solution);
}

fn infusion_two_compartments() {
    let regimen = DosingRegimen::infusion(1, 100.0, 25.0, 24.0).unwrap();
    let solution = steady_state(
        &TwoCompartments,
        &Dopri45::default(),
        &regimen,
        &[0.1, 3.0, 1.0],
        2,
        &NewtonSolver::default(),
    )
    .unwrap();
    black_box(solution);
}

fn bolus_with_sensitivity() {
    let regimen = DosingRegimen::bolus(1, 100.0, 24.0).unwrap();
    let result = steady_state_with_sensitivity(
        &OneCompartment,
        &Dopri45::default(),
        &regimen,
        &[0.1],
        1,
        &NewtonSolver::default(),
    )
    .unwrap();
    black_box(result);
}

fn benchmarks(c: &mut Criterion) {
    c.bench_function("bolus_one_compartment", |b| b.iter(bolus_one_compartment));
    c.bench_function("infusion_two_compartments", |b| {
        b.iter(infusion_two_compartments)
    });
    c.bench_function("bolus_with_sensitivity", |b| b.iter(bolus_with_sensitivity));
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
