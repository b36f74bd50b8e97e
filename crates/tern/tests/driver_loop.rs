// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Whole-driver loop over loopback UDP: setup -> image creation -> status
//! messages -> loss NAK -> heartbeat -> lifecycle reaping.

use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use tern::buffer::AtomicBuffer;
use tern::concurrent::{BroadcastTransmitter, CountersManager, ManualNanoClock, COUNTER_LENGTH};
use tern::config::DriverConfig;
use tern::driver::{
    conductor_channel, receiver_channel, ClientProxy, DataPacketDispatcher, DriverConductor,
    Receiver, SystemCounters, UdpReceiveChannelEndpoint, ON_AVAILABLE_IMAGE, ON_UNAVAILABLE_IMAGE,
};
use tern::protocol::data::{encode_data_header, encode_heartbeat, DataHeader, HEADER_LENGTH, UNFRAGMENTED};
use tern::protocol::nak::parse_nak;
use tern::protocol::setup::{encode_setup, Setup, SETUP_LENGTH};
use tern::protocol::status::parse_status_message;
use tern::protocol::{frame_type, HDR_TYPE_NAK, HDR_TYPE_SM};

const LIVENESS_TIMEOUT_NS: i64 = 1_000_000_000;

struct Driver {
    receiver: Receiver,
    conductor: DriverConductor,
    endpoint: Arc<UdpReceiveChannelEndpoint>,
    manager: Arc<CountersManager>,
    broadcast_buffer: AtomicBuffer,
    clock: Arc<ManualNanoClock>,
}

fn driver() -> Driver {
    let config = DriverConfig {
        initial_window_length: 32_768,
        image_liveness_timeout_ns: LIVENESS_TIMEOUT_NS,
        status_message_timeout_ns: 100_000,
        nak_delay_ns: 0,
        mtu_length: 4096,
        counters_buffer_length: COUNTER_LENGTH * 64,
        broadcast_buffer_length: 65_536,
    };
    config.validate().expect("config valid");

    let clock = Arc::new(ManualNanoClock::new(0));
    let (conductor_proxy, conductor_commands) = conductor_channel();
    let (receiver_proxy, receiver_commands) = receiver_channel();

    let dispatcher = DataPacketDispatcher::new(conductor_proxy);
    let endpoint = UdpReceiveChannelEndpoint::new(
        "udp://127.0.0.1:0",
        "127.0.0.1:0".parse().expect("valid addr"),
        None,
        dispatcher,
    )
    .expect("endpoint binds");

    let receiver = Receiver::new(
        receiver_commands,
        Arc::clone(&endpoint),
        clock.clone(),
        &config,
    );

    let manager = Arc::new(CountersManager::new(AtomicBuffer::allocate(
        config.counters_buffer_length,
    )));
    let system_counters = SystemCounters::new(&manager).expect("slots available");
    let broadcast_buffer = AtomicBuffer::allocate(config.broadcast_total_length());
    let client_proxy = ClientProxy::new(
        BroadcastTransmitter::new(broadcast_buffer.clone()).expect("valid capacity"),
    );

    let conductor = DriverConductor::new(
        conductor_commands,
        receiver_proxy,
        Arc::clone(&manager),
        system_counters,
        client_proxy,
        clock.clone(),
        config,
    );

    Driver {
        receiver,
        conductor,
        endpoint,
        manager,
        broadcast_buffer,
        clock,
    }
}

fn sender_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("sender binds");
    socket
        .set_read_timeout(Some(Duration::from_millis(20)))
        .expect("timeout set");
    socket
}

fn send_setup(sender: &UdpSocket, driver: &Driver) {
    let mut frame = [0u8; SETUP_LENGTH];
    encode_setup(
        &mut frame,
        &Setup {
            term_offset: 0,
            session_id: 11,
            stream_id: 1001,
            initial_term_id: 7,
            active_term_id: 7,
            term_length: 65_536,
            mtu: 4096,
        },
    )
    .expect("fits");
    sender
        .send_to(&frame, driver.endpoint.bind_address())
        .expect("setup sent");
}

fn send_data(sender: &UdpSocket, driver: &Driver, term_offset: i32, payload_length: usize) {
    let mut frame = vec![0u8; HEADER_LENGTH + payload_length];
    encode_data_header(
        &mut frame,
        &DataHeader {
            frame_length: (HEADER_LENGTH + payload_length) as i32,
            flags: UNFRAGMENTED,
            term_offset,
            session_id: 11,
            stream_id: 1001,
            term_id: 7,
            reserved_value: 0,
        },
    )
    .expect("fits");
    frame[HEADER_LENGTH..].fill(0x42);
    sender
        .send_to(&frame, driver.endpoint.bind_address())
        .expect("data sent");
}

/// Tick both agents until the sender observes a frame of `wanted_type`.
fn pump_until_frame(sender: &UdpSocket, driver: &mut Driver, wanted_type: u16) -> Vec<u8> {
    let mut buf = [0u8; 256];

    for _ in 0..200 {
        driver.receiver.do_work();
        driver.conductor.do_work();

        match sender.recv(&mut buf) {
            Ok(length) => {
                if frame_type(&buf[..length]) == Some(wanted_type) {
                    return buf[..length].to_vec();
                }
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => panic!("sender recv failed: {e}"),
        }
    }

    panic!("frame of type 0x{wanted_type:02x} never arrived");
}

fn pump(driver: &mut Driver, times: usize) {
    for _ in 0..times {
        driver.receiver.do_work();
        driver.conductor.do_work();
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn full_receive_loop() {
    let mut driver = driver();
    let sender = sender_socket();

    // Subscribe, then announce the stream.
    driver.conductor.add_subscription(1001);
    pump(&mut driver, 2);
    send_setup(&sender, &driver);

    let mut created = false;
    for _ in 0..200 {
        pump(&mut driver, 1);
        if driver.conductor.image_count() == 1 {
            created = true;
            break;
        }
    }
    assert!(created, "image was not created from the setup");

    // The conductor's first rebuild tick advances the announced position to
    // the subscriber's (zero); the receiver then emits a status message.
    let sm_frame = pump_until_frame(&sender, &mut driver, HDR_TYPE_SM);
    let sm = parse_status_message(&sm_frame).expect("valid sm");
    assert_eq!(sm.session_id, 11);
    assert_eq!(sm.stream_id, 1001);
    assert_eq!(sm.receiver_window_length, 32_768);

    // Loss: frames at 0 and 96 leave a gap over [32, 96). With zero NAK
    // delay the conductor dispatches on activation and the receiver NAKs.
    send_data(&sender, &driver, 0, 0);
    send_data(&sender, &driver, 96, 0);

    let nak_frame = pump_until_frame(&sender, &mut driver, HDR_TYPE_NAK);
    let nak = parse_nak(&nak_frame).expect("valid nak");
    assert_eq!(nak.session_id, 11);
    assert_eq!(nak.stream_id, 1001);
    assert_eq!(nak.term_id, 7);
    assert_eq!(nak.term_offset, 32);
    assert_eq!(nak.length, 64);

    // Heartbeat: counted, never written. The heartbeats counter is the
    // first system counter allocated.
    assert_eq!(
        driver.manager.label(0).as_deref(),
        Some("Heartbeats received")
    );
    let mut heartbeat = [0u8; HEADER_LENGTH];
    encode_heartbeat(&mut heartbeat, 11, 1001, 7, 128).expect("fits");
    sender
        .send_to(&heartbeat, driver.endpoint.bind_address())
        .expect("heartbeat sent");

    let mut counted = false;
    for _ in 0..200 {
        pump(&mut driver, 1);
        if driver.manager.counter_value(0) == 1 {
            counted = true;
            break;
        }
    }
    assert!(counted, "heartbeat was not counted");

    // Lifecycle: no packets past the liveness timeout retires the image on
    // the receiver, then the conductor lingers and reaps it.
    driver.clock.set(LIVENESS_TIMEOUT_NS + 1);
    driver.receiver.do_work();
    assert_eq!(driver.receiver.image_count(), 0);

    driver.conductor.do_work();
    assert_eq!(driver.conductor.image_count(), 1, "not yet lingered out");

    driver.clock.set(2 * LIVENESS_TIMEOUT_NS + 2);
    driver.conductor.do_work();
    driver.clock.set(3 * LIVENESS_TIMEOUT_NS + 3);
    driver.conductor.do_work();
    assert_eq!(driver.conductor.image_count(), 0, "image not reaped");

    // Client broadcast carries available then unavailable events.
    let mut record_types = vec![];
    let mut offset = 0usize;
    let tail = driver.broadcast_buffer.get_i64(65_536) as usize;
    while offset < tail {
        let record_length = driver.broadcast_buffer.get_i32(offset + 8) as usize;
        record_types.push(driver.broadcast_buffer.get_i32(offset + 16));
        offset += record_length;
    }
    assert!(record_types.contains(&ON_AVAILABLE_IMAGE));
    assert!(record_types.contains(&ON_UNAVAILABLE_IMAGE));
}

#[test]
fn data_for_unsubscribed_stream_is_ignored() {
    let mut driver = driver();
    let sender = sender_socket();

    // No subscription: neither the setup nor data may create or reach an
    // image.
    send_setup(&sender, &driver);
    send_data(&sender, &driver, 0, 64);
    pump(&mut driver, 10);

    assert_eq!(driver.conductor.image_count(), 0);
    assert_eq!(driver.endpoint.dispatcher().image_count(), 0);
}
