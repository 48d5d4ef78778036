use criterion::criterion_main;


criterion_main!(writer::benches, measure::benches, load::benches);
