//! Encoding and envelope benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use dagjose_core::{encode_document, DidKeyResolver, Document, HashAlgorithm};
use dagjose_envelope::{decode_encrypted, decode_signed, encode_encrypted, encode_signed};
use dagjose_testkit::fixtures::golden_identity;

fn document(fields: usize) -> Document {
    let mut doc = Document::new();
    for i in 0..fields {
        doc.insert(format!("field_{i}"), format!("value number {i}"));
    }
    doc
}

fn bench_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical");
    for fields in [1usize, 16, 256] {
        let doc = document(fields);
        let size = encode_document(&doc).map(|b| b.len()).unwrap_or(0);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", fields), &doc, |b, doc| {
            b.iter(|| encode_document(black_box(doc)))
        });
        for hash in [HashAlgorithm::Sha2_256, HashAlgorithm::Blake3] {
            group.bench_with_input(
                BenchmarkId::new(format!("block_{}", hash.name()), fields),
                &doc,
                |b, doc| b.iter(|| dagjose_core::document_block(black_box(doc), hash)),
            );
        }
    }
    group.finish();
}

fn bench_envelopes(c: &mut Criterion) {
    let identity = golden_identity();
    let doc = document(16);
    let mut group = c.benchmark_group("envelope");

    group.bench_function("sign", |b| b.iter(|| encode_signed(black_box(&doc), &identity)));

    if let Ok(blocks) = encode_signed(&doc, &identity) {
        group.bench_function("verify", |b| {
            b.iter(|| decode_signed(black_box(&blocks.envelope), &blocks.payload, &DidKeyResolver))
        });
    }

    let recipients = [identity.did().clone()];
    let mut rng = StdRng::seed_from_u64(1);
    group.bench_function("encrypt", |b| {
        b.iter(|| encode_encrypted(black_box(&doc), &recipients, &DidKeyResolver, &mut rng))
    });

    let mut rng = StdRng::seed_from_u64(1);
    if let Ok(block) = encode_encrypted(&doc, &recipients, &DidKeyResolver, &mut rng) {
        group.bench_function("decrypt", |b| {
            b.iter(|| decode_encrypted(black_box(&block), &identity))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_canonical, bench_envelopes);
criterion_main!(benches);
