use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use modzip::{FixedRandom, ZipFile};
use std::sync::Arc;

fn generate_compressible_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        data.extend_from_slice(pattern);
    }
    data.truncate(size);
    data
}

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = 0x12345678u32;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

fn build_archive(data: &[u8], entries: usize) -> Vec<u8> {
    let mut zip = ZipFile::new();
    let chunk = (data.len() / entries).max(1);
    for (i, part) in data.chunks(chunk).enumerate() {
        zip.add_entry(&format!("mods/{:04}.jar", i), part.to_vec(), None, None)
            .unwrap();
    }
    zip.to_buffer().unwrap()
}

fn format_size(size: usize) -> String {
    if size >= 1024 * 1024 {
        format!("{}MB", size / (1024 * 1024))
    } else {
        format!("{}KB", size / 1024)
    }
}

fn bench_read(c: &mut Criterion) {
    let sizes = vec![
        100 * 1024,       // 100KB
        1024 * 1024,      // 1MB
        10 * 1024 * 1024, // 10MB
    ];

    for size in sizes {
        let mut group = c.benchmark_group(format!("read_{}", format_size(size)));
        group.throughput(Throughput::Bytes(size as u64));

        for (label, data) in [
            ("compressible", generate_compressible_data(size)),
            ("random", generate_random_data(size)),
        ] {
            let archive = build_archive(&data, 16);
            group.bench_function(BenchmarkId::new(label, size), |b| {
                b.iter(|| {
                    let mut zip = ZipFile::from_bytes(archive.clone()).unwrap();
                    for entry in zip.entries().unwrap() {
                        black_box(entry.decompressed_data(None).unwrap());
                    }
                });
            });
        }

        group.finish();
    }
}

fn bench_write(c: &mut Criterion) {
    let size = 1024 * 1024;
    let data = generate_compressible_data(size);

    let mut group = c.benchmark_group("write_1MB");
    group.throughput(Throughput::Bytes(size as u64));

    for level in [1u32, 6, 9] {
        group.bench_function(BenchmarkId::new("deflate_level", level), |b| {
            b.iter(|| {
                let mut zip = ZipFile::with_options(
                    modzip::ArchiveOptions::default().with_compression_level(level),
                );
                zip.add_entry("data.bin", data.clone(), None, None).unwrap();
                black_box(zip.to_buffer().unwrap())
            });
        });
    }

    group.bench_function("zipcrypto", |b| {
        b.iter(|| {
            let mut zip = ZipFile::new();
            zip.set_random_source(Arc::new(FixedRandom::new(vec![9, 8, 7])));
            zip.add_encrypted_entry("data.bin", data.clone(), "p@ss").unwrap();
            black_box(zip.to_buffer().unwrap())
        });
    });

    group.finish();
}

fn bench_rewrite_unchanged(c: &mut Criterion) {
    let archive = build_archive(&generate_random_data(4 * 1024 * 1024), 256);

    c.bench_function("rewrite_one_of_256", |b| {
        b.iter(|| {
            let mut zip = ZipFile::from_bytes(archive.clone()).unwrap();
            zip.update_entry("mods/0000.jar", b"patched".to_vec()).unwrap();
            black_box(zip.to_buffer().unwrap())
        });
    });
}

criterion_group!(benches, bench_read, bench_write, bench_rewrite_unchanged);
criterion_main!(benches);
