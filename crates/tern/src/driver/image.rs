// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publication image: per-(channel, session, stream) reception state
//!
//! One image reassembles the byte stream of one publisher's flow. Three
//! actors touch it concurrently and never block each other:
//!
//! - the **receiver** inserts packets, emits status messages, sends NAKs,
//!   and watches liveness;
//! - the **conductor** tracks the rebuilt prefix, dispatches loss, zeroes
//!   trailing buffer space, and manages subscribers and lifecycle;
//! - **subscribers** advance their own position counters and read terms
//!   through the header-release ordering established on insert.
//!
//! Lifecycle:
//!
//! ```text
//!              first setup            liveness timeout
//!   +------+  (conductor)  +--------+  (receiver)  +----------+
//!   | INIT | ------------> | ACTIVE | -----------> | INACTIVE |
//!   +------+               +--------+              +----------+
//!                                                       | drained or timeout
//!                                                       | (conductor)
//!       reaped             +--------+   timeout         v
//!   <--------------------- | LINGER | <-----------------+
//!       (conductor)        +--------+
//! ```
//!
//! Fields are partitioned by writer and padded onto separate cachelines so
//! the receiver's per-packet stores never evict the conductor's hot line or
//! the cross-thread published fields.

use std::net::SocketAddr;
use std::sync::atomic::{fence, AtomicBool, AtomicI32, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::buffer::{
    compute_position, compute_term_id_from_position, index_by_position, insert,
    position_bits_to_shift, RawLog,
};
use crate::concurrent::{AtomicCounter, NanoClock, ReadablePosition, BufferPosition};
use crate::protocol::data::is_heartbeat;
use crate::protocol::rtt::RttMeasurement;

use super::endpoint::ReceiveChannelEndpoint;
use super::feedback::FeedbackDelayGenerator;
use super::loss_detector::{rebuild_offset, work_count, GapHandler, LossDetector};
use super::system_counters::{SystemCounterDescriptor, SystemCounters};

/// Lifecycle state of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImageStatus {
    /// Created, not yet receiving.
    Init = 0,
    /// Receiving and feeding back.
    Active = 1,
    /// No packets within the liveness timeout; draining subscribers.
    Inactive = 2,
    /// Drained; held so in-flight references can observe the state.
    Linger = 3,
}

impl ImageStatus {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Active,
            2 => Self::Inactive,
            _ => Self::Linger,
        }
    }
}

/// Outcome of a conductor time tick, acted on by the conductor in the same
/// duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTimeEvent {
    /// INACTIVE -> LINGER: subscribers drained or timed out.
    TransitionedToLinger,
    /// LINGER expired; the image may be reaped.
    ReachedEndOfLife,
}

// Writer-partitioned state. Each group lives on its own cacheline.

/// Conductor-only: position up to which trailing term memory is zeroed.
#[derive(Debug)]
struct ConductorFields {
    clean_position: AtomicI64,
}

/// Receiver-only hot fields, stored per accepted packet or sent message.
#[derive(Debug)]
struct ReceiverHotFields {
    last_packet_timestamp_ns: AtomicI64,
    last_status_message_timestamp_ns: AtomicI64,
    last_status_message_position: AtomicI64,
}

/// Loss handoff: a seqlock with the version tail only. The conductor
/// publishes a gap descriptor; the receiver confirms a consistent snapshot
/// against the begin counter and sends at most one NAK per change number.
#[derive(Debug)]
struct LossChangeFields {
    begin_loss_change: AtomicI64,
    end_loss_change: AtomicI64,
    loss_term_id: AtomicI32,
    loss_term_offset: AtomicI32,
    loss_length: AtomicI32,
    /// Receiver-local high-water mark of consumed change numbers.
    last_change_number: AtomicI64,
}

/// Construction parameters for a publication image.
pub struct ImageParams {
    pub correlation_id: i64,
    pub image_liveness_timeout_ns: i64,
    pub channel_endpoint: Arc<dyn ReceiveChannelEndpoint>,
    pub control_address: SocketAddr,
    pub source_address: SocketAddr,
    pub session_id: i32,
    pub stream_id: i32,
    pub initial_term_id: i32,
    pub active_term_id: i32,
    pub initial_term_offset: i32,
    pub initial_window_length: i32,
    pub raw_log: RawLog,
    pub loss_feedback_delay_generator: Box<dyn FeedbackDelayGenerator>,
    pub subscriber_positions: Vec<Arc<dyn ReadablePosition>>,
    pub hwm_position: BufferPosition,
    pub rebuild_position: BufferPosition,
    pub clock: Arc<dyn NanoClock>,
}

/// Receiver-side state for one publisher's (session, stream) within a
/// channel.
///
/// # Contract preconditions
///
/// The raw log's term length is a positive power of two (enforced by
/// [`RawLog::allocate`]) and the initial window fits within a term. Position
/// arithmetic is undefined if violated.
pub struct PublicationImage {
    conductor_fields: CachePadded<ConductorFields>,
    hot_fields: CachePadded<ReceiverHotFields>,
    /// Conductor-published; receiver reads when emitting status messages.
    new_status_message_position: CachePadded<AtomicI64>,
    loss_change: CachePadded<LossChangeFields>,

    correlation_id: i64,
    image_liveness_timeout_ns: i64,
    session_id: i32,
    stream_id: i32,
    initial_term_id: i32,
    position_bits_to_shift: u32,
    term_length_mask: i64,
    current_window_length: i32,
    current_gain: i32,

    status: AtomicU32,
    time_of_last_status_change_ns: AtomicI64,
    reached_end_of_life: AtomicBool,

    raw_log: RawLog,
    control_address: SocketAddr,
    source_address: SocketAddr,
    channel_endpoint: Arc<dyn ReceiveChannelEndpoint>,
    clock: Arc<dyn NanoClock>,

    hwm_position: BufferPosition,
    rebuild_position: BufferPosition,
    subscriber_positions: ArcSwap<Vec<Arc<dyn ReadablePosition>>>,
    /// Conductor-confined; locked only from `track_rebuild`, so the receiver
    /// path never contends on it.
    loss_detector: Mutex<LossDetector>,

    heartbeats_received: AtomicCounter,
    status_messages_sent: AtomicCounter,
    nak_messages_sent: AtomicCounter,
    flow_control_under_runs: AtomicCounter,
    flow_control_over_runs: AtomicCounter,
}

impl PublicationImage {
    pub fn new(params: ImageParams, system_counters: &SystemCounters) -> Self {
        let term_length = params.raw_log.term_length();
        let current_window_length =
            (term_length as i64 / 2).min(i64::from(params.initial_window_length)) as i32;
        let current_gain = current_window_length / 4;
        let term_length_mask = term_length as i64 - 1;
        let bits_to_shift = position_bits_to_shift(term_length);

        let initial_position = compute_position(
            params.active_term_id,
            params.initial_term_offset,
            bits_to_shift,
            params.initial_term_id,
        );
        let initial_status_message_position = initial_position - i64::from(current_gain + 1);

        let now_ns = params.clock.nano_time();

        Self {
            conductor_fields: CachePadded::new(ConductorFields {
                clean_position: AtomicI64::new(initial_position),
            }),
            hot_fields: CachePadded::new(ReceiverHotFields {
                last_packet_timestamp_ns: AtomicI64::new(now_ns),
                last_status_message_timestamp_ns: AtomicI64::new(0),
                last_status_message_position: AtomicI64::new(initial_status_message_position),
            }),
            new_status_message_position: CachePadded::new(AtomicI64::new(
                initial_status_message_position,
            )),
            loss_change: CachePadded::new(LossChangeFields {
                begin_loss_change: AtomicI64::new(-1),
                end_loss_change: AtomicI64::new(-1),
                loss_term_id: AtomicI32::new(0),
                loss_term_offset: AtomicI32::new(0),
                loss_length: AtomicI32::new(0),
                last_change_number: AtomicI64::new(-1),
            }),

            correlation_id: params.correlation_id,
            image_liveness_timeout_ns: params.image_liveness_timeout_ns,
            session_id: params.session_id,
            stream_id: params.stream_id,
            initial_term_id: params.initial_term_id,
            position_bits_to_shift: bits_to_shift,
            term_length_mask,
            current_window_length,
            current_gain,

            status: AtomicU32::new(ImageStatus::Init as u32),
            time_of_last_status_change_ns: AtomicI64::new(now_ns),
            reached_end_of_life: AtomicBool::new(false),

            control_address: params.control_address,
            source_address: params.source_address,
            channel_endpoint: params.channel_endpoint,
            clock: params.clock,

            subscriber_positions: ArcSwap::from_pointee(params.subscriber_positions),
            loss_detector: Mutex::new(LossDetector::new(params.loss_feedback_delay_generator)),

            heartbeats_received: system_counters
                .get(SystemCounterDescriptor::HeartbeatsReceived)
                .clone(),
            status_messages_sent: system_counters
                .get(SystemCounterDescriptor::StatusMessagesSent)
                .clone(),
            nak_messages_sent: system_counters
                .get(SystemCounterDescriptor::NakMessagesSent)
                .clone(),
            flow_control_under_runs: system_counters
                .get(SystemCounterDescriptor::FlowControlUnderRuns)
                .clone(),
            flow_control_over_runs: system_counters
                .get(SystemCounterDescriptor::FlowControlOverRuns)
                .clone(),

            hwm_position: {
                params.hwm_position.set_ordered(initial_position);
                params.hwm_position
            },
            rebuild_position: {
                params.rebuild_position.set_ordered(initial_position);
                params.rebuild_position
            },
            raw_log: params.raw_log,
        }
    }

    /// Release positions and the raw log. Called once, by the conductor,
    /// after end of life.
    pub fn close(&self) {
        self.hwm_position.close();
        self.rebuild_position.close();
        for position in self.subscriber_positions.load().iter() {
            position.close();
        }

        self.raw_log.close();
    }

    #[must_use]
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }

    /// The session id of the channel from a publisher.
    #[must_use]
    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    /// The stream id of this image within a channel.
    #[must_use]
    pub fn stream_id(&self) -> i32 {
        self.stream_id
    }

    /// The channel URI this image was created for.
    #[must_use]
    pub fn channel_uri_string(&self) -> &str {
        self.channel_endpoint.original_uri_string()
    }

    /// The address of the source associated with the image.
    #[must_use]
    pub fn source_address(&self) -> SocketAddr {
        self.source_address
    }

    /// The control address status messages and NAKs are sent to.
    #[must_use]
    pub fn control_address(&self) -> SocketAddr {
        self.control_address
    }

    /// The channel endpoint the image is attached to.
    #[must_use]
    pub fn channel_endpoint(&self) -> &Arc<dyn ReceiveChannelEndpoint> {
        &self.channel_endpoint
    }

    /// Detach from the dispatch fan-out so no further packets are delivered.
    /// Called from the receiver thread.
    pub fn remove_from_dispatcher(self: &Arc<Self>) {
        self.channel_endpoint.remove_publication_image(self);
    }

    /// Does this image match a given endpoint (by identity) and stream id?
    #[must_use]
    pub fn matches(
        &self,
        channel_endpoint: &Arc<dyn ReceiveChannelEndpoint>,
        stream_id: i32,
    ) -> bool {
        self.stream_id == stream_id && Arc::ptr_eq(&self.channel_endpoint, channel_endpoint)
    }

    /// The raw log backing this image.
    #[must_use]
    pub fn raw_log(&self) -> &RawLog {
        &self.raw_log
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ImageStatus {
        ImageStatus::from_u32(self.status.load(Ordering::Acquire))
    }

    /// Set the lifecycle status, stamping the transition time.
    ///
    /// The receiver drives INIT -> ACTIVE -> INACTIVE; the conductor drives
    /// INACTIVE -> LINGER.
    pub fn set_status(&self, status: ImageStatus) {
        log::debug!(
            "image {} session={} stream={}: {:?} -> {:?}",
            self.correlation_id,
            self.session_id,
            self.stream_id,
            self.status(),
            status
        );
        self.time_of_last_status_change_ns
            .store(self.clock.nano_time(), Ordering::Relaxed);
        self.status.store(status as u32, Ordering::Release);
    }

    /// Set status to INACTIVE, but only if currently ACTIVE. Called from the
    /// receiver.
    pub fn if_active_go_inactive(&self) {
        if ImageStatus::Active == self.status() {
            self.set_status(ImageStatus::Inactive);
        }
    }

    /// Insert a frame into the term it belongs to.
    ///
    /// Always returns the frame length; the sender's accounting is based on
    /// frame length, not acceptance. Drops are observable only through the
    /// under/over-run counters and a high-water mark that does not advance.
    pub fn insert_packet(&self, term_id: i32, term_offset: i32, frame: &[u8]) -> usize {
        let length = frame.len();
        let heartbeat = is_heartbeat(frame);
        let packet_position = compute_position(
            term_id,
            term_offset,
            self.position_bits_to_shift,
            self.initial_term_id,
        );
        let proposed_position = if heartbeat {
            packet_position
        } else {
            packet_position + length as i64
        };
        let window_position = self.hot_fields.last_status_message_position.load(Ordering::Relaxed);

        if !self.is_flow_control_under_run(window_position, packet_position)
            && !self.is_flow_control_over_run(window_position, proposed_position)
        {
            if heartbeat {
                self.heartbeats_received.increment_ordered();
            } else {
                let index = index_by_position(packet_position, self.position_bits_to_shift);
                insert(
                    &self.raw_log.term_buffers()[index],
                    term_offset as usize,
                    frame,
                );
            }

            self.hwm_candidate(proposed_position);
        }

        length
    }

    /// Track the rebuild of the stream: status-message advance, trailing
    /// buffer hygiene, and the loss scan. Called from the conductor.
    pub fn track_rebuild(&self, now_ns: i64) -> i32 {
        let subscribers = self.subscriber_positions.load();
        let mut min_subscriber_position = i64::MAX;
        let mut max_subscriber_position = i64::MIN;

        for position in subscribers.iter() {
            let value = position.get_volatile();
            min_subscriber_position = min_subscriber_position.min(value);
            max_subscriber_position = max_subscriber_position.max(value);
        }

        if !subscribers.is_empty()
            && min_subscriber_position
                > self.new_status_message_position.load(Ordering::Relaxed)
                    + i64::from(self.current_gain)
        {
            self.new_status_message_position
                .store(min_subscriber_position, Ordering::Release);
            self.clean_buffer_to(min_subscriber_position - (self.term_length_mask + 1));
        }

        let rebuild_position = self.rebuild_position.get().max(max_subscriber_position);
        let term_index = index_by_position(rebuild_position, self.position_bits_to_shift);

        let scan_outcome = self.loss_detector.lock().scan(
            &self.raw_log.term_buffers()[term_index],
            rebuild_position,
            self.hwm_position.get_volatile(),
            now_ns,
            self.term_length_mask,
            self.position_bits_to_shift,
            self.initial_term_id,
            self,
        );

        let rebuild_term_offset = rebuild_position & self.term_length_mask;
        let new_rebuild_position =
            (rebuild_position - rebuild_term_offset) + i64::from(rebuild_offset(scan_outcome));
        self.rebuild_position.propose_max_ordered(new_rebuild_position);

        work_count(scan_outcome)
    }

    /// Whether packets have arrived within the liveness timeout. Called from
    /// the receiver to decide on retirement.
    #[must_use]
    pub fn check_for_activity(&self, now_ns: i64) -> bool {
        now_ns
            <= self.hot_fields.last_packet_timestamp_ns.load(Ordering::Relaxed)
                + self.image_liveness_timeout_ns
    }

    /// Send a pending status message if the announced position moved or the
    /// keepalive timeout expired. Called from the receiver.
    pub fn send_pending_status_message(&self, now_ns: i64, status_message_timeout_ns: i64) -> i32 {
        if ImageStatus::Active != self.status() {
            return 0;
        }

        let status_message_position = self.new_status_message_position.load(Ordering::Acquire);
        let hot = &self.hot_fields;

        if status_message_position != hot.last_status_message_position.load(Ordering::Relaxed)
            || now_ns
                > hot.last_status_message_timestamp_ns.load(Ordering::Relaxed)
                    + status_message_timeout_ns
        {
            let term_id = compute_term_id_from_position(
                status_message_position,
                self.position_bits_to_shift,
                self.initial_term_id,
            );
            let term_offset = (status_message_position & self.term_length_mask) as i32;

            self.channel_endpoint.send_status_message(
                self.control_address,
                self.session_id,
                self.stream_id,
                term_id,
                term_offset,
                self.current_window_length,
                0,
            );

            hot.last_status_message_timestamp_ns.store(now_ns, Ordering::Relaxed);
            hot.last_status_message_position
                .store(status_message_position, Ordering::Relaxed);
            self.status_messages_sent.increment_ordered();

            return 1;
        }

        0
    }

    /// Process any pending loss descriptor published by the conductor,
    /// sending at most one NAK per change. Called from the receiver.
    pub fn process_pending_loss(&self) -> i32 {
        let loss = &*self.loss_change;
        let change_number = loss.end_loss_change.load(Ordering::Acquire);

        if change_number != loss.last_change_number.load(Ordering::Relaxed) {
            let term_id = loss.loss_term_id.load(Ordering::Relaxed);
            let term_offset = loss.loss_term_offset.load(Ordering::Relaxed);
            let length = loss.loss_length.load(Ordering::Relaxed);

            // Keep the payload loads above from moving past the begin check.
            fence(Ordering::Acquire);

            if change_number == loss.begin_loss_change.load(Ordering::Relaxed) {
                self.channel_endpoint.send_nak_message(
                    self.control_address,
                    self.session_id,
                    self.stream_id,
                    term_id,
                    term_offset,
                    length,
                );
                loss.last_change_number.store(change_number, Ordering::Relaxed);
                self.nak_messages_sent.increment_ordered();

                return 1;
            }
            // Conductor mid-publish; retry on a later tick.
        }

        0
    }

    /// Reserved hook for an RTT reply from the sender.
    pub fn on_rtt_measurement(&self, _header: &RttMeasurement, _source_address: SocketAddr) {
        // TODO: feed the sample into a congestion-control strategy once the
        // driver grows one.
    }

    /// Stop tracking a subscriber for flow control and release its counter.
    /// Called from the conductor.
    pub fn remove_subscriber(&self, subscriber_position: &Arc<dyn ReadablePosition>) {
        let current = self.subscriber_positions.load_full();
        let next: Vec<Arc<dyn ReadablePosition>> = current
            .iter()
            .filter(|p| p.id() != subscriber_position.id())
            .cloned()
            .collect();
        self.subscriber_positions.store(Arc::new(next));
        subscriber_position.close();
    }

    /// Track a new subscriber's position for flow control. Called from the
    /// conductor.
    pub fn add_subscriber(&self, subscriber_position: Arc<dyn ReadablePosition>) {
        let current = self.subscriber_positions.load_full();
        let mut next: Vec<Arc<dyn ReadablePosition>> = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(subscriber_position);
        self.subscriber_positions.store(Arc::new(next));
    }

    /// Number of subscribers tracked for flow control.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_positions.load().len()
    }

    /// The position up to which the stream rebuild is complete.
    #[must_use]
    pub fn rebuild_position(&self) -> i64 {
        self.rebuild_position.get()
    }

    /// High-water mark of observed frame ends.
    #[must_use]
    pub fn hwm_position(&self) -> i64 {
        self.hwm_position.get_volatile()
    }

    /// Conductor time tick driving INACTIVE -> LINGER -> end of life.
    pub fn on_time_event(&self, now_ns: i64) -> Option<ImageTimeEvent> {
        match self.status() {
            ImageStatus::Inactive => {
                if self.is_drained()
                    || now_ns
                        > self.time_of_last_status_change_ns.load(Ordering::Relaxed)
                            + self.image_liveness_timeout_ns
                {
                    self.set_status(ImageStatus::Linger);
                    return Some(ImageTimeEvent::TransitionedToLinger);
                }
            }
            ImageStatus::Linger => {
                if now_ns
                    > self.time_of_last_status_change_ns.load(Ordering::Relaxed)
                        + self.image_liveness_timeout_ns
                {
                    self.reached_end_of_life.store(true, Ordering::Release);
                    return Some(ImageTimeEvent::ReachedEndOfLife);
                }
            }
            _ => {}
        }

        None
    }

    /// Whether the conductor's reaper may release this image.
    #[must_use]
    pub fn has_reached_end_of_life(&self) -> bool {
        self.reached_end_of_life.load(Ordering::Acquire)
    }

    /// Time of the last lifecycle transition.
    #[must_use]
    pub fn time_of_last_state_change(&self) -> i64 {
        self.time_of_last_status_change_ns.load(Ordering::Relaxed)
    }

    /// Deliberate no-op. The managed-resource interface carries a stamp
    /// setter, but the image stamps its own transitions in [`set_status`];
    /// accepting external stamps would let the reaper fight the state
    /// machine.
    ///
    /// [`set_status`]: Self::set_status
    pub fn set_time_of_last_state_change(&self, _time_ns: i64) {}

    /// Release all resources. Reaper-facing alias for [`close`].
    ///
    /// [`close`]: Self::close
    pub fn delete(&self) {
        self.close();
    }

    /// Every subscriber has consumed up to the rebuild position.
    fn is_drained(&self) -> bool {
        let mut min_subscriber_position = i64::MAX;

        for position in self.subscriber_positions.load().iter() {
            min_subscriber_position = min_subscriber_position.min(position.get_volatile());
        }

        min_subscriber_position >= self.rebuild_position.get()
    }

    fn hwm_candidate(&self, proposed_position: i64) {
        self.hot_fields
            .last_packet_timestamp_ns
            .store(self.clock.nano_time(), Ordering::Relaxed);
        self.hwm_position.propose_max_ordered(proposed_position);
    }

    fn is_flow_control_under_run(&self, window_position: i64, packet_position: i64) -> bool {
        let under_run = packet_position < window_position;

        if under_run {
            self.flow_control_under_runs.increment_ordered();
        }

        under_run
    }

    fn is_flow_control_over_run(&self, window_position: i64, proposed_position: i64) -> bool {
        let over_run =
            proposed_position > window_position + i64::from(self.current_window_length);

        if over_run {
            self.flow_control_over_runs.increment_ordered();
        }

        over_run
    }

    /// Zero trailing term memory so the term the writer next rotates into is
    /// blank. Bounded to the remainder of one dirty term per call.
    fn clean_buffer_to(&self, new_clean_position: i64) {
        let clean_position = self.conductor_fields.clean_position.load(Ordering::Relaxed);
        let bytes_for_cleaning = new_clean_position - clean_position;
        let dirty_term = &self.raw_log.term_buffers()
            [index_by_position(clean_position, self.position_bits_to_shift)];
        let term_offset = (clean_position & self.term_length_mask) as usize;
        let length = bytes_for_cleaning.min((dirty_term.capacity() - term_offset) as i64);

        if length > 0 {
            dirty_term.set_memory(term_offset, length as usize, 0);
            self.conductor_fields
                .clean_position
                .store(clean_position + length, Ordering::Relaxed);
        }
    }
}

impl GapHandler for PublicationImage {
    /// Publish a gap descriptor for the receiver. Runs on the conductor
    /// thread inside the loss scan.
    fn on_loss_detected(&self, term_id: i32, term_offset: i32, length: i32) {
        let loss = &*self.loss_change;
        let change_number = loss.begin_loss_change.load(Ordering::Relaxed) + 1;

        loss.begin_loss_change.store(change_number, Ordering::Relaxed);
        // Make the begin bump visible before any payload store, so a reader
        // that sees new payload fails its begin confirmation.
        fence(Ordering::Release);

        loss.loss_term_id.store(term_id, Ordering::Relaxed);
        loss.loss_term_offset.store(term_offset, Ordering::Relaxed);
        loss.loss_length.store(length, Ordering::Relaxed);

        loss.end_loss_change.store(change_number, Ordering::Release);
    }
}

impl std::fmt::Debug for PublicationImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicationImage")
            .field("correlation_id", &self.correlation_id)
            .field("session_id", &self.session_id)
            .field("stream_id", &self.stream_id)
            .field("status", &self.status())
            .field("hwm", &self.hwm_position.get_volatile())
            .field("rebuild", &self.rebuild_position.get_volatile())
            .finish()
    }
}
