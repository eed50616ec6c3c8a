use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use polycall::cache::{CacheKey, CachePolicy};
use polycall::runtime::Runtimes;
use polycall::scripts::{Language, fragment_for};
use rayon::prelude::*;

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache/resolve");
    let mut runtimes = Runtimes::new();
    let thread = runtimes.create_isolate().unwrap();
    let context = thread.context().unwrap();

    for policy in CachePolicy::ALL {
        for language in Language::ALL {
            let cache = thread.cache(policy).unwrap();
            let source = fragment_for(language).source;
            group.bench_with_input(
                BenchmarkId::new(policy.name(), language),
                &source,
                |b, source| {
                    b.iter(|| black_box(cache.resolve(context, language, source).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_contended_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache/contended");
    let mut runtimes = Runtimes::new();
    let thread = runtimes.create_isolate().unwrap();
    let context = thread.context().unwrap();
    let source = fragment_for(Language::Js).source;

    for policy in [CachePolicy::Unsynchronized, CachePolicy::Synchronized] {
        let cache = thread.cache(policy).unwrap();
        cache.resolve(context, Language::Js, source).unwrap();
        group.throughput(Throughput::Elements(64));
        group.bench_function(BenchmarkId::from_parameter(policy.name()), |b| {
            b.iter(|| {
                (0..64).into_par_iter().for_each(|_| {
                    black_box(cache.resolve(context, Language::Js, source).unwrap());
                });
            });
        });
    }

    group.finish();
}

fn bench_cache_key(c: &mut Criterion) {
    let source = fragment_for(Language::Ruby).source;
    c.bench_function("cache/key", |b| {
        b.iter(|| black_box(CacheKey::new(Language::Ruby, black_box(source))));
    });
}

criterion_group!(benches, bench_resolve, bench_contended_resolve, bench_cache_key);
criterion_main!(benches);
