use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sonde_decode::correlator::Correlator;

fn benchmark_correlate(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlate");

    for &sync_len in &[2usize, 4, 8] {
        let syncword: u64 = 0x086d_5388_4469_481f;
        let corr = Correlator::new(syncword, sync_len);
        let frame = vec![0xA5u8; 400];

        group.bench_with_input(BenchmarkId::from_parameter(sync_len), &sync_len, |b, _| {
            b.iter(|| corr.correlate(black_box(&frame)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_correlate);
criterion_main!(benches);
