use compactbin_cryptography::Blake3;
use compactbin_package::{Config, Package};
use criterion::{criterion_group, Criterion};
use std::hint::black_box;

fn benchmark_load(c: &mut Criterion) {
    for (attachments, size) in [(16usize, 1024usize), (16, 1 << 20)] {
        let mut stream = Vec::new();
        super::sample::<Blake3>(attachments, size)
            .save(&mut stream)
            .unwrap();
        for parallel_verify in [false, true] {
            let cfg = Config {
                parallel_verify,
                ..Config::default()
            };
            c.bench_function(
                &format!(
                    "{}/attachments={} size={} parallel={}",
                    module_path!(),
                    attachments,
                    size,
                    parallel_verify
                ),
                |b| {
                    b.iter(|| {
                        let mut reader = &stream[..];
                        black_box(Package::<Blake3>::load(&mut reader, &cfg).unwrap())
                    });
                },
            );
        }
    }
}

criterion_group!(benches, benchmark_load);
