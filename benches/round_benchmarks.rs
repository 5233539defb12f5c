use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qkd_link::{
    quantum::{run_round, sift, ProtectionMode, RngSource, RoundRequest},
    SessionBuilder,
};

fn benchmark_rounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_round");

    for count in [40usize, 1_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        for (label, mode, eavesdropper) in [
            ("protected", ProtectionMode::Protected, false),
            ("protected_eve", ProtectionMode::Protected, true),
            ("unprotected_eve", ProtectionMode::Unprotected, true),
        ] {
            let request = RoundRequest::new(eavesdropper, mode, count);
            group.bench_with_input(BenchmarkId::new(label, count), &request, |b, request| {
                let mut source = RngSource::seeded(42);
                b.iter(|| black_box(run_round(&mut source, request).unwrap()));
            });
        }
    }

    group.finish();
}

fn benchmark_sifting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sift");

    for count in [40usize, 10_000] {
        let request = RoundRequest::new(false, ProtectionMode::Unprotected, count);
        let outcome = run_round(&mut RngSource::seeded(7), &request).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(count), &outcome, |b, outcome| {
            b.iter_with_setup(
                || (outcome.sender.clone(), outcome.receiver.clone()),
                |(mut sender, mut receiver)| black_box(sift(&mut sender, &mut receiver)),
            );
        });
    }

    group.finish();
}

fn benchmark_session(c: &mut Criterion) {
    c.bench_function("session_establish_and_renew", |b| {
        b.iter_with_setup(
            || SessionBuilder::new().instant().with_seed(1).build().unwrap(),
            |mut session| {
                session.start_secure(true);
                session.auto_renew();
                black_box(session.renew(true));
            },
        );
    });
}

criterion_group!(benches, benchmark_rounds, benchmark_sifting, benchmark_session);
criterion_main!(benches);
