//! 익스포트 경로 벤치마크
//!
//! 직렬화, 버퍼 push(축출 포함), 버퍼 배출의 처리량을 측정합니다.

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use evexport_core::event::Event;
use evexport_core::pipeline::{SendOutcome, Transport};
use evexport_core::types::{Action, FlowRecord, FlowState, PacketRecord, Severity, Verdict};
use evexport_exporter::{EventBuffer, ExportCounters, FixedClock, flush_buffer, serialize};

/// 모든 메시지를 받아들이고 버리는 전송 계층
struct NullTransport;

impl Transport for NullTransport {
    fn send_nonblocking(&mut self, _message: &Bytes) -> SendOutcome {
        SendOutcome::Sent
    }

    fn close(&mut self) {}
}

fn sample_alert() -> Event {
    Event::Alert(PacketRecord {
        src_ip: Some("192.168.10.20".parse().unwrap()),
        dst_ip: Some("172.16.0.5".parse().unwrap()),
        ip_proto: Some(6),
        src_port: Some(51234),
        dst_port: Some(443),
        tcp_flags: Some(0x18),
        length: 1420,
        action: Action::Drop,
        verdict: Some(Verdict::Force),
        severity: Severity::High,
    })
}

fn sample_flow() -> Event {
    Event::Flow(FlowRecord {
        client_ip: "192.168.10.20".parse().unwrap(),
        server_ip: "172.16.0.5".parse().unwrap(),
        client_port: 51234,
        server_port: 443,
        protocol: 6,
        state: FlowState::Inspect,
        session_flags: 0x0011,
        client_packets: 120,
        server_packets: 98,
        client_bytes: 18_000,
        server_bytes: 240_000,
    })
}

fn bench_serialize(c: &mut Criterion) {
    let clock = FixedClock(1_700_000_000_000);
    let alert = sample_alert();
    let flow = sample_flow();

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(1));
    group.bench_function("alert", |b| {
        b.iter(|| serialize(black_box(&alert), &clock).unwrap())
    });
    group.bench_function("flow", |b| {
        b.iter(|| serialize(black_box(&flow), &clock).unwrap())
    });
    group.finish();
}

fn bench_push(c: &mut Criterion) {
    let payload = serialize(&sample_alert(), &FixedClock(0)).unwrap();

    let mut group = c.benchmark_group("buffer_push");
    group.throughput(Throughput::Elements(1));

    // 여유 공간이 있는 버퍼
    group.bench_function("with_room", |b| {
        let mut buffer = EventBuffer::new(1_000_000);
        b.iter(|| buffer.push(black_box(payload.clone())))
    });

    // 가득 찬 버퍼 (매 push마다 축출)
    group.bench_function("evicting", |b| {
        let mut buffer = EventBuffer::new(1_000);
        for _ in 0..1_000 {
            buffer.push(payload.clone());
        }
        b.iter(|| buffer.push(black_box(payload.clone())))
    });

    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let payload = serialize(&sample_alert(), &FixedClock(0)).unwrap();

    let mut group = c.benchmark_group("flush_buffer");
    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let counters = ExportCounters::new();
            let mut transport = NullTransport;
            b.iter_batched(
                || {
                    let mut buffer = EventBuffer::new(size);
                    for _ in 0..size {
                        buffer.push(payload.clone());
                    }
                    buffer
                },
                |mut buffer| flush_buffer(&mut buffer, &mut transport, &counters),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_push, bench_flush);
criterion_main!(benches);
