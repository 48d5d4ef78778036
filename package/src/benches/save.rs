use compactbin_cryptography::Blake3;
use criterion::{criterion_group, Criterion};
use std::hint::black_box;

fn benchmark_save(c: &mut Criterion) {
    for (attachments, size) in [(16usize, 1024usize), (4, 1 << 20)] {
        let package = super::sample::<Blake3>(attachments, size);
        let mut stream = Vec::new();
        c.bench_function(
            &format!(
                "{}/attachments={} size={}",
                module_path!(),
                attachments,
                size
            ),
            |b| {
                b.iter(|| {
                    stream.clear();
                    package.save(&mut stream).unwrap();
                    black_box(stream.len())
                });
            },
        );
    }
}

criterion_group!(benches, benchmark_save);
