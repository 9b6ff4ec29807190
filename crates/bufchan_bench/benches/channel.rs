//! Buffered channel benchmarks.

use bufchan_bench::random_data;
use bufchan_core::BufferedChannel;
use bufchan_storage::{FileBackend, InMemoryBackend, StorageBackend};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

/// Small writes into an in-memory backend at several buffer capacities.
fn bench_buffered_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffered_write");
    let data = random_data(64);

    for capacity in [256, 4096, 65536].iter() {
        group.throughput(Throughput::Bytes(64));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                let mut channel = BufferedChannel::new(InMemoryBackend::new(), capacity).unwrap();
                b.iter(|| {
                    channel.write(black_box(&data)).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Buffered writes against unbuffered appends on a real file.
fn bench_file_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write_1000x64");
    group.sample_size(20);
    let data = random_data(64);

    group.bench_function("unbuffered", |b| {
        b.iter(|| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("bench.dat")).unwrap();
            for _ in 0..1000 {
                backend.append(black_box(&data)).unwrap();
            }
            backend.flush().unwrap();
        });
    });

    group.bench_function("channel_4k", |b| {
        b.iter(|| {
            let temp_dir = TempDir::new().unwrap();
            let backend = FileBackend::open(&temp_dir.path().join("bench.dat")).unwrap();
            let mut channel = BufferedChannel::new(backend, 4096).unwrap();
            for _ in 0..1000 {
                channel.write(black_box(&data)).unwrap();
            }
            channel.flush().unwrap();
        });
    });

    group.finish();
}

/// Reads that straddle the durable/buffered boundary.
fn bench_merged_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("merged_read");

    let mut channel = BufferedChannel::new(InMemoryBackend::new(), 8192).unwrap();
    channel.write(&random_data(16384)).unwrap();
    channel.write(&random_data(4096)).unwrap();
    let boundary = channel.file_position();

    for len in [64usize, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let start = boundary - (len as u64 / 2);
            let mut out = Vec::with_capacity(len);
            b.iter(|| {
                out.clear();
                let n = channel.read(&mut out, black_box(start), black_box(len)).unwrap();
                black_box(n);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffered_write, bench_file_write, bench_merged_read);
criterion_main!(benches);
