use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sonde_decode::dsp::{AfskDemod, GfskDemod};
use sonde_decode::record::ParserStatus;

fn synthetic_samples(n_bits: usize, samples_per_symbol: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(n_bits * samples_per_symbol);
    for i in 0..n_bits {
        let v = if i % 2 == 0 { 1.0 } else { -1.0 };
        out.extend(std::iter::repeat(v).take(samples_per_symbol));
    }
    out
}

fn benchmark_gfsk_demod(c: &mut Criterion) {
    let samples = synthetic_samples(4000, 10);

    c.bench_function("gfsk_demod_4000_bits", |b| {
        b.iter(|| {
            let mut demod = GfskDemod::new(48_000.0, 4800.0);
            let mut cursor = 0;
            let mut bits = Vec::new();
            let status = demod.demod(black_box(&samples), &mut cursor, &mut bits, 4000);
            assert_eq!(status, ParserStatus::Parsed);
            bits
        })
    });
}

fn benchmark_afsk_demod(c: &mut Criterion) {
    let samples = synthetic_samples(2000, 12);

    c.bench_function("afsk_demod_2000_bits", |b| {
        b.iter(|| {
            let mut demod = AfskDemod::new(48_000.0, 4800.0, 1200.0, 2200.0);
            let mut cursor = 0;
            let mut bits = Vec::new();
            let status = demod.demod(black_box(&samples), &mut cursor, &mut bits, 2000);
            assert_eq!(status, ParserStatus::Parsed);
            bits
        })
    });
}

criterion_group!(benches, benchmark_gfsk_demod, benchmark_afsk_demod);
criterion_main!(benches);
