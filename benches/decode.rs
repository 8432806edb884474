//! Benchmarks for message decoding and archive streaming
//!
//! Body extraction dominates decode time for large messages; archive reading
//! is bounded by the chunk handoff between the pump and the blocking worker.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mimetar::{VecSource, decode_message, open_archive};

/// Build a message with a base64 text part and a quoted-printable html part
fn generate_message(size: usize) -> Vec<u8> {
    let line = b"The quick brown fox jumps over the lazy dog. 0123456789\r\n";
    let text: Vec<u8> = line.iter().copied().cycle().take(size).collect();

    let mut base64 = Vec::with_capacity(size * 4 / 3 + size / 38);
    {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&text);
        // 76-column lines, as mail clients write them
        for chunk in encoded.as_bytes().chunks(76) {
            base64.extend_from_slice(chunk);
            base64.extend_from_slice(b"\r\n");
        }
    }

    let mut raw = Vec::with_capacity(size * 3);
    raw.extend_from_slice(
        b"From bench\r\nFrom: a@example.com\r\nTo: b@example.com\r\n\
Subject: =?UTF-8?Q?Benchmark_=E2=9C=93?=\r\n\
Content-Type: multipart/mixed; boundary=bench\r\n\r\n\
--bench\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\n",
    );
    raw.extend_from_slice(&base64);
    raw.extend_from_slice(
        b"--bench\r\nContent-Type: text/html\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\n",
    );
    for line in text.split_inclusive(|&b| b == b'\n') {
        raw.extend_from_slice(b"<p>=3D");
        raw.extend_from_slice(line);
    }
    raw.extend_from_slice(b"\r\n--bench--\r\n");
    raw
}

fn generate_tarball(files: usize, file_size: usize) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let data = vec![0xA5u8; file_size];
    for i in 0..files {
        let mut header = tar::Header::new_gnu();
        header.set_size(file_size as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("file-{i}.bin"), &data[..])
            .expect("in-memory tar");
    }
    builder.into_inner().expect("in-memory tar")
}

fn bench_decode_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");

    for size in [1_024, 10_240, 102_400, 1_024_000].iter() {
        let raw = generate_message(*size);
        group.throughput(Throughput::Bytes(raw.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            size,
            |b, _| {
                b.iter(|| decode_message(black_box(&raw)).expect("valid message"));
            },
        );
    }

    group.finish();
}

fn bench_archive_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_read");
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let tarball = generate_tarball(64, 16_384);

    // Chunk size controls how many handoffs a read takes
    for chunk_size in [512, 4_096, 65_536].iter() {
        group.throughput(Throughput::Bytes(tarball.len() as u64));
        let chunks: Vec<Vec<u8>> = tarball.chunks(*chunk_size).map(<[u8]>::to_vec).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{chunk_size}B_chunks")),
            chunk_size,
            |b, _| {
                b.iter(|| {
                    runtime.block_on(async {
                        let mut reader = open_archive(VecSource::new(chunks.clone()));
                        let mut total = 0;
                        while let Some(entry) = reader.next_entry().await.expect("valid archive") {
                            let content = reader.read_entry_to_end().await.expect("valid entry");
                            assert_eq!(content.len() as u64, entry.size);
                            total += content.len();
                        }
                        black_box(total)
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_message, bench_archive_read);
criterion_main!(benches);
