// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hot-path benchmarks: packet insertion and the per-tick conductor and
//! receiver paths an idle driver pays for every image.

use std::net::SocketAddr;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use tern::buffer::{AtomicBuffer, RawLog};
use tern::concurrent::{
    BufferPosition, CountersManager, ReadablePosition, SystemNanoClock, COUNTER_LENGTH,
};
use tern::driver::{
    ImageParams, ImageStatus, PublicationImage, ReceiveChannelEndpoint, StaticDelayGenerator,
    SystemCounters,
};
use tern::protocol::data::{encode_data_header, DataHeader, HEADER_LENGTH, UNFRAGMENTED};

const TERM_LENGTH: usize = 65_536;
const FRAME_LENGTH: usize = 512;

#[derive(Debug)]
struct NullEndpoint;

impl ReceiveChannelEndpoint for NullEndpoint {
    fn send_status_message(
        &self,
        _control_address: SocketAddr,
        _session_id: i32,
        _stream_id: i32,
        _term_id: i32,
        _term_offset: i32,
        _window_length: i32,
        _flags: u8,
    ) {
    }

    fn send_nak_message(
        &self,
        _control_address: SocketAddr,
        _session_id: i32,
        _stream_id: i32,
        _term_id: i32,
        _term_offset: i32,
        _length: i32,
    ) {
    }

    fn remove_publication_image(&self, _image: &Arc<PublicationImage>) {}

    fn original_uri_string(&self) -> &str {
        "udp://239.255.0.1:40456"
    }
}

fn image() -> (Arc<PublicationImage>, BufferPosition) {
    let manager = Arc::new(CountersManager::new(AtomicBuffer::allocate(
        COUNTER_LENGTH * 16,
    )));
    let counters = SystemCounters::new(&manager).expect("slots available");
    let subscriber = BufferPosition::allocate(&manager, "sub").expect("slot");

    let image = Arc::new(PublicationImage::new(
        ImageParams {
            correlation_id: 1,
            image_liveness_timeout_ns: i64::MAX / 2,
            channel_endpoint: Arc::new(NullEndpoint) as Arc<dyn ReceiveChannelEndpoint>,
            control_address: "127.0.0.1:40456".parse().expect("valid addr"),
            source_address: "127.0.0.1:50000".parse().expect("valid addr"),
            session_id: 1,
            stream_id: 10,
            initial_term_id: 0,
            active_term_id: 0,
            initial_term_offset: 0,
            initial_window_length: 32_768,
            raw_log: RawLog::allocate(TERM_LENGTH).expect("valid term length"),
            loss_feedback_delay_generator: Box::new(StaticDelayGenerator::new(0, false)),
            subscriber_positions: vec![Arc::new(subscriber.clone()) as Arc<dyn ReadablePosition>],
            hwm_position: BufferPosition::allocate(&manager, "hwm").expect("slot"),
            rebuild_position: BufferPosition::allocate(&manager, "rebuild").expect("slot"),
            clock: Arc::new(SystemNanoClock::new()),
        },
        &counters,
    ));
    image.set_status(ImageStatus::Active);

    (image, subscriber)
}

fn frame(term_offset: i32) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LENGTH];
    encode_data_header(
        &mut frame,
        &DataHeader {
            frame_length: FRAME_LENGTH as i32,
            flags: UNFRAGMENTED,
            term_offset,
            session_id: 1,
            stream_id: 10,
            term_id: 0,
            reserved_value: 0,
        },
    )
    .expect("fits");
    frame[HEADER_LENGTH..].fill(0x33);
    frame
}

fn bench_insert_packet(c: &mut Criterion) {
    let (image, _subscriber) = image();
    let frames: Vec<Vec<u8>> = (0..32).map(|i| frame(i * FRAME_LENGTH as i32)).collect();

    let mut group = c.benchmark_group("insert_packet");
    group.throughput(Throughput::Bytes(FRAME_LENGTH as u64));
    group.bench_function("in_window", |b| {
        let mut index = 0usize;
        b.iter(|| {
            let slot = index & 31;
            index += 1;
            let frame = &frames[slot];
            let offset = (slot * FRAME_LENGTH) as i32;
            black_box(image.insert_packet(0, black_box(offset), frame));
        });
    });
    group.finish();
}

fn bench_idle_ticks(c: &mut Criterion) {
    let (image, subscriber) = image();

    // Contiguous prefix so the conductor tick runs the caught-up path.
    for i in 0..32 {
        let offset = i * FRAME_LENGTH as i32;
        image.insert_packet(0, offset, &frame(offset));
    }
    subscriber.set_ordered((32 * FRAME_LENGTH) as i64);
    image.track_rebuild(0);

    c.bench_function("track_rebuild_caught_up", |b| {
        let mut now = 1i64;
        b.iter(|| {
            now += 1;
            black_box(image.track_rebuild(black_box(now)));
        });
    });

    c.bench_function("process_pending_loss_quiescent", |b| {
        b.iter(|| black_box(image.process_pending_loss()));
    });
}

criterion_group!(benches, bench_insert_packet, bench_idle_ticks);
criterion_main!(benches);
