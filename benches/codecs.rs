use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsolink::fec::{LdpcCodec, LdpcConfig, RsCodec, RsConfig};

fn bench_reed_solomon(c: &mut Criterion) {
    let mut rs = RsCodec::new(255, 223, RsConfig::default()).unwrap();
    let data: Vec<u8> = (0..223).map(|i| i as u8).collect();
    let clean = rs.encode(&data).unwrap();

    c.bench_function("rs_255_223_encode", |b| {
        b.iter(|| rs.encode(black_box(&data)).unwrap())
    });

    c.bench_function("rs_255_223_decode_clean", |b| {
        b.iter(|| rs.decode(black_box(&clean)).unwrap())
    });

    for errors in [4usize, 16] {
        let mut corrupted = clean.clone();
        for i in 0..errors {
            corrupted[i * 14] ^= 0x5a;
        }
        c.bench_with_input(
            BenchmarkId::new("rs_255_223_decode", errors),
            &corrupted,
            |b, input| b.iter(|| rs.decode(black_box(input)).unwrap()),
        );
    }
}

fn bench_ldpc(c: &mut Criterion) {
    let mut ldpc = LdpcCodec::new(1024, 512, LdpcConfig::default()).unwrap();
    let data: Vec<u8> = (0..512).map(|i| (i % 2) as u8).collect();
    let clean = ldpc.encode(&data).unwrap();

    c.bench_function("ldpc_1024_512_encode", |b| {
        b.iter(|| ldpc.encode(black_box(&data)).unwrap())
    });

    c.bench_function("ldpc_1024_512_decode_clean", |b| {
        b.iter(|| ldpc.decode(black_box(&clean)).unwrap())
    });

    let mut corrupted = clean.clone();
    for pos in [10usize, 250, 500, 750, 1000] {
        corrupted[pos] ^= 1;
    }
    c.bench_function("ldpc_1024_512_decode_5_errors", |b| {
        b.iter(|| ldpc.decode(black_box(&corrupted)).unwrap())
    });
}

fn bench_construction(c: &mut Criterion) {
    c.bench_function("ldpc_1024_512_construction", |b| {
        b.iter(|| LdpcCodec::new(1024, 512, LdpcConfig::default()).unwrap())
    });
}

criterion_group!(codec_benches, bench_reed_solomon, bench_ldpc, bench_construction);
criterion_main!(codec_benches);
