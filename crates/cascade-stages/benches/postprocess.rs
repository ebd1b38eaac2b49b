use cascade_stages::{entropy, softmax_slice};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_softmax_entropy(c: &mut Criterion) {
    let logits: Vec<f32> = (0..1000).map(|i| ((i * 37) % 101) as f32 * 0.05 - 2.5).collect();
    let pair = [1.25_f32, -0.75];

    c.bench_function("softmax_entropy_1000", |b| {
        b.iter(|| {
            let dist = softmax_slice(0, black_box(&logits)).unwrap();
            black_box(entropy(&dist))
        })
    });

    c.bench_function("softmax_entropy_pair", |b| {
        b.iter(|| {
            let dist = softmax_slice(0, black_box(&pair)).unwrap();
            black_box(entropy(&dist))
        })
    });
}

criterion_group!(benches, bench_softmax_entropy);
criterion_main!(benches);
