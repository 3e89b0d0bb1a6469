use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use gamewire::core::codec::{Frame, FrameCodec};
use gamewire::core::cursor::ByteCursor;
use gamewire::core::varint::VarInt;
use tokio_util::codec::{Decoder, Encoder};

#[allow(clippy::unwrap_used)]
fn bench_frame_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode_decode");
    let payload_sizes = [64usize, 512, 4096, 65536, 1024 * 1024];

    for &size in &payload_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || Bytes::from(vec![0u8; size]),
                |payload| {
                    let mut codec = FrameCodec::default();
                    let mut buf = BytesMut::with_capacity(size + 8);
                    codec.encode(Frame::new(0x07, payload), &mut buf).unwrap();
                    buf
                },
                BatchSize::SmallInput,
            )
        });

        let mut wire = BytesMut::new();
        FrameCodec::default()
            .encode(Frame::new(0x07, Bytes::from(vec![0u8; size])), &mut wire)
            .unwrap();
        group.bench_function(format!("decode_{size}b"), |b| {
            b.iter_batched(
                || wire.clone(),
                |mut buf| {
                    let mut codec = FrameCodec::default();
                    codec.decode(&mut buf).unwrap().unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_varint_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    // Multiplier walks the values across every encoded width.
    let values: Vec<i32> = (0..1024).map(|i| (i as i32).wrapping_mul(-1640531527)).collect();

    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("encode_1k_values", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(values.len() * VarInt::MAX_BYTES);
            for &value in &values {
                VarInt(value).encode(&mut buf);
            }
            buf
        })
    });

    let mut wire = BytesMut::with_capacity(values.len() * VarInt::MAX_BYTES);
    for &value in &values {
        VarInt(value).encode(&mut wire);
    }
    group.bench_function("decode_1k_values", |b| {
        b.iter(|| {
            let mut cursor = ByteCursor::new(&wire);
            let mut sum = 0i64;
            for _ in 0..values.len() {
                sum += i64::from(VarInt::decode(&mut cursor).unwrap().value());
            }
            sum
        })
    });

    group.finish();
}

criterion_group!(benches, bench_frame_encode_decode, bench_varint_roundtrip);
criterion_main!(benches);
