// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end behavior of a publication image driven by explicit receiver
//! and conductor ticks.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tern::buffer::{AtomicBuffer, RawLog};
use tern::concurrent::{
    BufferPosition, CountersManager, ManualNanoClock, ReadablePosition, COUNTER_LENGTH,
};
use tern::driver::{
    GapHandler, ImageParams, ImageStatus, ImageTimeEvent, PublicationImage,
    ReceiveChannelEndpoint, StaticDelayGenerator, SystemCounterDescriptor, SystemCounters,
};
use tern::protocol::data::{encode_data_header, encode_heartbeat, DataHeader, HEADER_LENGTH, UNFRAGMENTED};

const TERM_LENGTH: usize = 65_536;
const LIVENESS_TIMEOUT_NS: i64 = 1_000_000_000;
const SM_TIMEOUT_NS: i64 = 200_000_000;

#[derive(Debug, Default)]
struct RecordingEndpoint {
    status_messages: Mutex<Vec<(i32, i32, i32, i32, i32)>>,
    naks: Mutex<Vec<(i32, i32, i32, i32, i32)>>,
}

impl ReceiveChannelEndpoint for RecordingEndpoint {
    fn send_status_message(
        &self,
        _control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        window_length: i32,
        _flags: u8,
    ) {
        self.status_messages
            .lock()
            .expect("mutex poisoned")
            .push((session_id, stream_id, term_id, term_offset, window_length));
    }

    fn send_nak_message(
        &self,
        _control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        length: i32,
    ) {
        self.naks
            .lock()
            .expect("mutex poisoned")
            .push((session_id, stream_id, term_id, term_offset, length));
    }

    fn remove_publication_image(&self, _image: &Arc<PublicationImage>) {}

    fn original_uri_string(&self) -> &str {
        "udp://239.255.0.1:40456"
    }
}

struct Fixture {
    image: Arc<PublicationImage>,
    endpoint: Arc<RecordingEndpoint>,
    clock: Arc<ManualNanoClock>,
    manager: Arc<CountersManager>,
    counters: SystemCounters,
    subscriber: BufferPosition,
}

fn fixture(initial_window_length: i32) -> Fixture {
    let manager = Arc::new(CountersManager::new(AtomicBuffer::allocate(
        COUNTER_LENGTH * 32,
    )));
    let counters = SystemCounters::new(&manager).expect("slots available");
    let endpoint = Arc::new(RecordingEndpoint::default());
    let clock = Arc::new(ManualNanoClock::new(0));
    let subscriber = BufferPosition::allocate(&manager, "subscriber").expect("slot");

    let image = Arc::new(PublicationImage::new(
        ImageParams {
            correlation_id: 1,
            image_liveness_timeout_ns: LIVENESS_TIMEOUT_NS,
            channel_endpoint: endpoint.clone() as Arc<dyn ReceiveChannelEndpoint>,
            control_address: "127.0.0.1:40456".parse().expect("valid addr"),
            source_address: "127.0.0.1:50000".parse().expect("valid addr"),
            session_id: 11,
            stream_id: 1001,
            initial_term_id: 7,
            active_term_id: 7,
            initial_term_offset: 0,
            initial_window_length,
            raw_log: RawLog::allocate(TERM_LENGTH).expect("valid term length"),
            loss_feedback_delay_generator: Box::new(StaticDelayGenerator::new(0, false)),
            subscriber_positions: vec![Arc::new(subscriber.clone()) as Arc<dyn ReadablePosition>],
            hwm_position: BufferPosition::allocate(&manager, "hwm").expect("slot"),
            rebuild_position: BufferPosition::allocate(&manager, "rebuild").expect("slot"),
            clock: clock.clone(),
        },
        &counters,
    ));
    image.set_status(ImageStatus::Active);

    Fixture {
        image,
        endpoint,
        clock,
        manager,
        counters,
        subscriber,
    }
}

fn data_frame(term_id: i32, term_offset: i32, payload_length: usize) -> Vec<u8> {
    let mut frame = vec![0u8; HEADER_LENGTH + payload_length];
    encode_data_header(
        &mut frame,
        &DataHeader {
            frame_length: (HEADER_LENGTH + payload_length) as i32,
            flags: UNFRAGMENTED,
            term_offset,
            session_id: 11,
            stream_id: 1001,
            term_id,
            reserved_value: 0,
        },
    )
    .expect("header fits");
    frame[HEADER_LENGTH..].fill(0xA5);
    frame
}

fn counter(f: &Fixture, descriptor: SystemCounterDescriptor) -> i64 {
    f.counters.get(descriptor).get()
}

#[test]
fn straight_through_delivery() {
    let f = fixture(32_768);

    // window = min(term/2, 32768); gain = window / 4.
    let frame = data_frame(7, 0, 1024 - HEADER_LENGTH);
    assert_eq!(f.image.insert_packet(7, 0, &frame), 1024);
    assert_eq!(f.image.hwm_position(), 1024);

    // Fill up to 16K so the subscriber can legally advance there.
    for i in 1..16 {
        let frame = data_frame(7, i * 1024, 1024 - HEADER_LENGTH);
        f.image.insert_packet(7, i * 1024, &frame);
    }
    f.subscriber.set_ordered(16_384);
    f.image.track_rebuild(0);

    // min subscriber crossed the hysteresis threshold: announced position
    // advances; the cleaning target (16K - 64K) clamps below zero.
    assert_eq!(f.image.send_pending_status_message(1, SM_TIMEOUT_NS), 1);
    let messages = f.endpoint.status_messages.lock().expect("ok");
    assert_eq!(*messages.last().expect("sent"), (11, 1001, 7, 16_384, 32_768));
    assert_eq!(f.image.rebuild_position(), 16_384);
}

#[test]
fn heartbeat_advances_hwm_without_payload() {
    let f = fixture(32_768);
    let mut frame = [0u8; HEADER_LENGTH];
    encode_heartbeat(&mut frame, 11, 1001, 7, 2048).expect("fits");

    assert_eq!(f.image.insert_packet(7, 2048, &frame), HEADER_LENGTH);

    assert_eq!(counter(&f, SystemCounterDescriptor::HeartbeatsReceived), 1);
    assert_eq!(f.image.hwm_position(), 2048);
    // The term stays untouched.
    assert_eq!(f.image.raw_log().term_buffers()[0].get_i32_volatile(2048), 0);
}

#[test]
fn over_run_packet_is_dropped_and_counted() {
    let f = fixture(1024);

    let frame = data_frame(7, 0, 1500 - HEADER_LENGTH);
    assert_eq!(f.image.insert_packet(7, 0, &frame), 1500);

    assert_eq!(counter(&f, SystemCounterDescriptor::FlowControlOverRuns), 1);
    assert_eq!(f.image.hwm_position(), 0);
}

#[test]
fn under_run_packet_is_dropped_and_counted() {
    let f = fixture(32_768);

    // Advance the announced window to 4096.
    for i in 0..8 {
        let frame = data_frame(7, i * 1024, 1024 - HEADER_LENGTH);
        f.image.insert_packet(7, i * 1024, &frame);
    }
    f.subscriber.set_ordered(4096);
    f.image.track_rebuild(0);
    assert_eq!(f.image.send_pending_status_message(1, SM_TIMEOUT_NS), 1);

    let stale = data_frame(7, 2048, 256 - HEADER_LENGTH);
    assert_eq!(f.image.insert_packet(7, 2048, &stale), 256);

    assert_eq!(counter(&f, SystemCounterDescriptor::FlowControlUnderRuns), 1);
}

#[test]
fn loss_descriptor_produces_exactly_one_nak() {
    let f = fixture(32_768);

    f.image.on_loss_detected(7, 4096, 512);

    assert_eq!(f.image.process_pending_loss(), 1);
    assert_eq!(f.image.process_pending_loss(), 0);

    assert_eq!(
        *f.endpoint.naks.lock().expect("ok"),
        vec![(11, 1001, 7, 4096, 512)]
    );
    assert_eq!(counter(&f, SystemCounterDescriptor::NakMessagesSent), 1);
}

#[test]
fn conductor_scan_drives_nak_through_the_handoff() {
    let f = fixture(32_768);

    // Frames at 0 and 96 leave a gap over [32, 96).
    let head = data_frame(7, 0, 0);
    let tail = data_frame(7, 96, 0);
    f.image.insert_packet(7, 0, &head);
    f.image.insert_packet(7, 96, &tail);

    // Zero feedback delay: first scan activates, second dispatches.
    f.image.track_rebuild(0);
    f.image.track_rebuild(1);
    assert_eq!(f.image.process_pending_loss(), 1);

    assert_eq!(
        *f.endpoint.naks.lock().expect("ok"),
        vec![(11, 1001, 7, 32, 64)]
    );

    // Rebuild holds at the gap until it fills.
    assert_eq!(f.image.rebuild_position(), 32);
    let fill = data_frame(7, 32, 64 - HEADER_LENGTH);
    f.image.insert_packet(7, 32, &fill);
    f.image.track_rebuild(2);
    assert_eq!(f.image.rebuild_position(), 128);
}

#[test]
fn lifecycle_runs_to_reaping_exactly_once() {
    let f = fixture(32_768);

    // No packets past the liveness timeout: the receiver retires it.
    f.clock.set(LIVENESS_TIMEOUT_NS + 1);
    assert!(!f.image.check_for_activity(LIVENESS_TIMEOUT_NS + 1));
    f.image.if_active_go_inactive();
    assert_eq!(f.image.status(), ImageStatus::Inactive);

    // Drained immediately (subscriber at rebuild): conductor lingers it.
    assert_eq!(
        f.image.on_time_event(LIVENESS_TIMEOUT_NS + 2),
        Some(ImageTimeEvent::TransitionedToLinger)
    );

    // Linger holds for the timeout, then end of life.
    let linger_stamp = f.image.time_of_last_state_change();
    assert_eq!(f.image.on_time_event(linger_stamp + LIVENESS_TIMEOUT_NS), None);
    assert_eq!(
        f.image.on_time_event(linger_stamp + LIVENESS_TIMEOUT_NS + 1),
        Some(ImageTimeEvent::ReachedEndOfLife)
    );
    assert!(f.image.has_reached_end_of_life());

    f.image.delete();
    assert!(f.image.raw_log().is_closed());

    // Counters released back to the manager.
    let subscriber_id = ReadablePosition::id(&f.subscriber);
    assert_eq!(f.manager.label(subscriber_id), None);
}

#[test]
fn image_with_no_subscribers_lingers_once_inactive() {
    let manager = Arc::new(CountersManager::new(AtomicBuffer::allocate(
        COUNTER_LENGTH * 16,
    )));
    let counters = SystemCounters::new(&manager).expect("slots available");
    let endpoint = Arc::new(RecordingEndpoint::default());
    let clock = Arc::new(ManualNanoClock::new(0));

    let image = PublicationImage::new(
        ImageParams {
            correlation_id: 2,
            image_liveness_timeout_ns: LIVENESS_TIMEOUT_NS,
            channel_endpoint: endpoint as Arc<dyn ReceiveChannelEndpoint>,
            control_address: "127.0.0.1:40456".parse().expect("valid addr"),
            source_address: "127.0.0.1:50000".parse().expect("valid addr"),
            session_id: 12,
            stream_id: 1001,
            initial_term_id: 0,
            active_term_id: 0,
            initial_term_offset: 0,
            initial_window_length: 32_768,
            raw_log: RawLog::allocate(TERM_LENGTH).expect("valid term length"),
            loss_feedback_delay_generator: Box::new(StaticDelayGenerator::new(0, false)),
            subscriber_positions: vec![],
            hwm_position: BufferPosition::allocate(&manager, "hwm").expect("slot"),
            rebuild_position: BufferPosition::allocate(&manager, "rebuild").expect("slot"),
            clock: clock.clone(),
        },
        &counters,
    );

    image.set_status(ImageStatus::Inactive);
    assert_eq!(
        image.on_time_event(1),
        Some(ImageTimeEvent::TransitionedToLinger)
    );
}

#[test]
fn monotonic_positions_under_interleaved_ticks() {
    let f = fixture(32_768);
    let mut last_hwm = f.image.hwm_position();
    let mut last_rebuild = f.image.rebuild_position();

    for round in 0..64 {
        let offset = round * 512;
        let frame = data_frame(7, offset, 512 - HEADER_LENGTH);
        f.image.insert_packet(7, offset, &frame);
        // Consume up to the previously rebuilt prefix.
        f.subscriber.set_ordered(i64::from(offset));
        f.image.track_rebuild(i64::from(round));
        f.image
            .send_pending_status_message(i64::from(round), SM_TIMEOUT_NS);
        f.image.process_pending_loss();

        let hwm = f.image.hwm_position();
        let rebuild = f.image.rebuild_position();
        assert!(hwm >= last_hwm, "hwm regressed");
        assert!(rebuild >= last_rebuild, "rebuild regressed");
        assert!(rebuild <= hwm, "rebuild passed hwm");
        last_hwm = hwm;
        last_rebuild = rebuild;
    }
}
