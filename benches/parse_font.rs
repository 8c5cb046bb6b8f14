#![allow(unused)]
extern crate fieldscope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use fieldscope::prelude::*;
use std::hint::black_box;

/// Builds a synthetic font: a full directory of unknown tables plus a valid
/// `head` table, large enough to make lazy-vs-full production measurable.
fn synthetic_font(table_count: u16, table_size: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&table_count.to_be_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let directory_end = 12 + u32::from(table_count) * 16;
    let mut offset = directory_end;
    for index in 0..table_count {
        let tag = [b't', b'b', b'0' + (index % 10) as u8, b'0' + (index / 10) as u8];
        bytes.extend_from_slice(&tag);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.extend_from_slice(&table_size.to_be_bytes());
        offset += table_size;
    }
    bytes.resize(offset as usize, 0x55);
    bytes
}

/// Benchmark full tree production over a 30-table font.
fn bench_produce_all(c: &mut Criterion) {
    let data = synthetic_font(30, 4096);
    let size = data.len() as u64;

    let mut group = c.benchmark_group("produce_all");
    group.throughput(Throughput::Bytes(size));
    group.bench_function("ttf_30_tables", |b| {
        b.iter(|| {
            let mut font = TrueTypeFont::from_bytes(black_box(data.clone()));
            font.root_mut().produce_all().unwrap();
            black_box(font.root().len())
        });
    });
    group.finish();
}

/// Benchmark the lazy path: validation plus one named lookup, which should
/// only ever produce the fixed header.
fn bench_lazy_header(c: &mut Criterion) {
    let data = synthetic_font(30, 4096);

    let mut group = c.benchmark_group("lazy_header");
    group.bench_function("validate_and_nb_table", |b| {
        b.iter(|| {
            let mut font = TrueTypeFont::from_bytes(black_box(data.clone()));
            assert!(font.validate().is_valid());
            let node = font.root_mut().by_name("nb_table").unwrap().unwrap();
            black_box(node.as_field().unwrap().value().unwrap().as_u64())
        });
    });
    group.finish();
}

/// Benchmark raw unaligned bit extraction through the stream layer.
fn bench_bit_reads(c: &mut Criterion) {
    let stream = InputStream::from_bytes(vec![0xA5; 4096]);

    let mut group = c.benchmark_group("bit_reads");
    group.bench_function("unaligned_u64", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for offset in (3..32_000).step_by(64) {
                acc ^= stream.read_bits(black_box(offset), 64).unwrap();
            }
            black_box(acc)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_produce_all,
    bench_lazy_header,
    bench_bit_reads
);
criterion_main!(benches);
