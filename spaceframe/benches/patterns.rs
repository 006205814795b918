//! Pattern benchmarks over the in-process fabric: pair round trips,
//! pipeline throughput, and pub/sub fanout.
//!
//! Measures: per-message latency and delivery throughput of the typed
//! API, including the copy taken by sized receives.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spaceframe::{Domain, Message, Part, Socket, SocketType};
use std::time::Duration;

const MESSAGE_SIZES: &[usize] = &[64, 1024, 16384];
const MESSAGE_COUNT: usize = 100;
const FANOUT_SUBSCRIBERS: &[usize] = &[1, 2, 4];

/// One message each way over a connected pair, same thread.
fn pair_round_trip(c: &mut Criterion) {
    spaceframe::dev_tracing::init_tracing();
    let mut group = c.benchmark_group("patterns/pair_round_trip");

    for &size in MESSAGE_SIZES {
        let addr = format!("inproc://bench.pair.{size}");
        let mut left = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        left.bind(&addr).unwrap();
        let mut right = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        right.connect(&addr).unwrap();
        let payload = vec![0u8; size];

        group.throughput(Throughput::Bytes((size * 2) as u64));
        group.bench_with_input(BenchmarkId::new("bytes", size), &size, |b, _| {
            b.iter(|| {
                let mut out = Message::new();
                out.append_bytes(&payload);
                left.sendmsg(&mut out).unwrap();
                let over = right.recvmsg(1).unwrap();

                let mut back = Message::new();
                back.add_part(Part::from_bytes(over.at(0).unwrap().as_bytes()));
                right.sendmsg(&mut back).unwrap();
                black_box(left.recvmsg(1).unwrap());
            });
        });
    }
    group.finish();
}

/// A burst of jobs through a push/pull pipeline, sent then drained.
fn push_pull_throughput(c: &mut Criterion) {
    spaceframe::dev_tracing::init_tracing();
    let mut group = c.benchmark_group("patterns/push_pull_throughput");

    let mut push = Socket::new(Domain::Sp, SocketType::Push).unwrap();
    push.bind("inproc://bench.pipeline").unwrap();
    let mut pull = Socket::new(Domain::Sp, SocketType::Pull).unwrap();
    pull.connect("inproc://bench.pipeline").unwrap();
    let payload = vec![0u8; 256];

    group.throughput(Throughput::Elements(MESSAGE_COUNT as u64));
    group.bench_function("burst_100", |b| {
        b.iter(|| {
            for _ in 0..MESSAGE_COUNT {
                let mut msg = Message::new();
                msg.append_bytes(&payload);
                push.sendmsg(&mut msg).unwrap();
            }
            for _ in 0..MESSAGE_COUNT {
                black_box(pull.recvmsg(1).unwrap());
            }
        });
    });
    group.finish();
}

/// Broadcast to N subscribers; every copy is drained each iteration.
fn pubsub_fanout(c: &mut Criterion) {
    spaceframe::dev_tracing::init_tracing();
    let mut group = c.benchmark_group("patterns/pubsub_fanout");

    for &num_subs in FANOUT_SUBSCRIBERS {
        let addr = format!("inproc://bench.fanout.{num_subs}");
        let mut publisher = Socket::new(Domain::Sp, SocketType::Pub).unwrap();
        publisher.bind(&addr).unwrap();
        let mut subscribers: Vec<Socket> = (0..num_subs)
            .map(|_| {
                let mut sub = Socket::new(Domain::Sp, SocketType::Sub).unwrap();
                sub.subscribe(b"").unwrap();
                sub.connect(&addr).unwrap();
                sub
            })
            .collect();
        let payload = vec![0u8; 256];

        group.throughput(Throughput::Elements((MESSAGE_COUNT * num_subs) as u64));
        group.bench_with_input(
            BenchmarkId::new("subscribers", num_subs),
            &num_subs,
            |b, _| {
                b.iter(|| {
                    for _ in 0..MESSAGE_COUNT {
                        let mut msg = Message::new();
                        msg.append_bytes(&payload);
                        publisher.sendmsg(&mut msg).unwrap();
                    }
                    for sub in &mut subscribers {
                        for _ in 0..MESSAGE_COUNT {
                            black_box(sub.recvmsg(1).unwrap());
                        }
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(30);
    targets = pair_round_trip, push_pull_throughput, pubsub_fanout
);
criterion_main!(benches);
