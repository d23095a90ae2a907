//! Benchmarks for fsstat
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fsstat::model::{FsNodeRecord, SizeBucket, MIB};
use fsstat::walker::IdAllocator;

fn benchmark_classify(c: &mut Criterion) {
    let sizes: Vec<u64> = (0..1024u64).map(|i| i * 397 * 1024).collect();

    c.bench_function("classify_1024", |b| {
        b.iter(|| {
            for size in &sizes {
                black_box(SizeBucket::classify(black_box(*size)));
            }
        })
    });
}

fn benchmark_merge(c: &mut Criterion) {
    let children: Vec<FsNodeRecord> = (0..256u32)
        .map(|i| FsNodeRecord::file(i + 2, 1, format!("/f{}", i), u64::from(i) * MIB))
        .collect();

    c.bench_function("merge_256_children", |b| {
        b.iter(|| {
            let mut dir = FsNodeRecord::directory(1, 0, "/".into(), 4096);
            for child in &children {
                dir.merge(child);
            }
            black_box(dir);
        })
    });
}

fn benchmark_id_allocation(c: &mut Criterion) {
    let ids = IdAllocator::new();

    c.bench_function("id_next", |b| b.iter(|| black_box(ids.next_id())));
}

criterion_group!(benches, benchmark_classify, benchmark_merge, benchmark_id_allocation);
criterion_main!(benches);
