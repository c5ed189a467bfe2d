use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use memecc::ecc::bits::flip_bit;
use memecc::{BlockId, HammingCodec, ParityLedger};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn random_block(size: usize) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(size as u64);
    let mut block = vec![0u8; size];
    rng.fill(&mut block[..]);
    block
}

fn bench_encode(c: &mut Criterion) {
    let codec = HammingCodec::new();
    let mut group = c.benchmark_group("hamming_encode");
    for &size in &[8usize, 64, 512, 4096] {
        let block = random_block(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &block, |b, block| {
            let mut ledger = ParityLedger::new();
            b.iter(|| codec.encode(BlockId(0), black_box(block), &mut ledger).unwrap())
        });
    }
    group.finish();
}

fn bench_decode_with_flip(c: &mut Criterion) {
    let codec = HammingCodec::new();
    let mut group = c.benchmark_group("hamming_decode_single_flip");
    for &size in &[8usize, 64, 512, 4096] {
        let original = random_block(size);
        let mut ledger = ParityLedger::new();
        codec.encode(BlockId(0), &original, &mut ledger).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &original, |b, original| {
            b.iter(|| {
                let mut block = original.clone();
                flip_bit(&mut block, size * 4).unwrap();
                codec
                    .decode(BlockId(0), black_box(&mut block), &ledger)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode_with_flip);
criterion_main!(benches);
