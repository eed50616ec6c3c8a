use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polycall::backend::Coordinates;
use polycall::driver::{BenchmarkDriver, DriverConfig, ExecMode};
use polycall::scripts::Language;

fn coordinates() -> Coordinates {
    // Read through black_box so the arguments are not constant-folded.
    black_box(Coordinates::new(51.507222, -0.1275, 40.7127, -74.0059))
}

fn bench_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("invocation");
    let mut driver = BenchmarkDriver::new(DriverConfig::default());

    for mode in ExecMode::ALL {
        for language in Language::ALL {
            let case = mode.case(language, coordinates());
            let id = BenchmarkId::new(format!("mode-{}", mode), language);
            let mut prepared = match driver.prepare(&case) {
                Ok(prepared) => prepared,
                Err(err) => panic!("{}: {}", case, err),
            };
            group.bench_function(id, |b| {
                b.iter(|| black_box(prepared.invoke().unwrap()));
            });
            prepared.finish();
        }
    }

    group.finish();
}

fn bench_reused_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("invocation/reuse-context");
    let mut driver = BenchmarkDriver::new(DriverConfig {
        reuse_context: true,
        ..DriverConfig::default()
    });

    for mode in [ExecMode::NativeSynchronizedCache, ExecMode::VmGuest] {
        let case = mode.case(Language::Ruby, coordinates());
        let mut prepared = driver.prepare(&case).unwrap();
        group.bench_function(BenchmarkId::from_parameter(format!("mode-{}", mode)), |b| {
            b.iter(|| black_box(prepared.invoke().unwrap()));
        });
        prepared.finish();
    }

    group.finish();
}

criterion_group!(benches, bench_modes, bench_reused_context);
criterion_main!(benches);
