// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Driver conductor
//!
//! The lifecycle half of the driver: creates images when the receiver sees a
//! setup for a subscribed stream, drives every image's rebuild tracking and
//! time events, owns subscriptions, and reaps images that reach end of life.
//! Clients learn of availability changes through the broadcast ring.

use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::{Receiver as ChannelReceiver, Sender, TrySendError};

use crate::concurrent::{BufferPosition, CountersManager, NanoClock, ReadablePosition};
use crate::config::DriverConfig;
use crate::buffer::RawLog;
use crate::protocol::setup::Setup;

use super::client_proxy::ClientProxy;
use super::endpoint::ReceiveChannelEndpoint;
use super::feedback::StaticDelayGenerator;
use super::image::{ImageParams, ImageTimeEvent, PublicationImage};
use super::receiver::ReceiverProxy;
use super::system_counters::SystemCounters;

/// Commands handed from the receiver to the conductor.
pub enum ConductorCommand {
    /// A setup arrived for a subscribed stream with no image.
    CreatePublicationImage {
        setup: Setup,
        source_address: SocketAddr,
        channel_endpoint: Arc<dyn ReceiveChannelEndpoint>,
    },
}

/// Receiver-side handle for posting [`ConductorCommand`]s.
#[derive(Clone)]
pub struct ConductorProxy {
    sender: Sender<ConductorCommand>,
}

impl ConductorProxy {
    pub fn create_publication_image(
        &self,
        setup: Setup,
        source_address: SocketAddr,
        channel_endpoint: Arc<dyn ReceiveChannelEndpoint>,
    ) {
        let command = ConductorCommand::CreatePublicationImage {
            setup,
            source_address,
            channel_endpoint,
        };
        if let Err(TrySendError::Disconnected(_)) = self.sender.try_send(command) {
            log::warn!("conductor command dropped: conductor has shut down");
        }
    }
}

/// Create the receiver-to-conductor command channel.
#[must_use]
pub fn conductor_channel() -> (ConductorProxy, ChannelReceiver<ConductorCommand>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ConductorProxy { sender }, receiver)
}

/// A client's interest in a stream, with the per-image positions allocated
/// for it.
struct SubscriptionLink {
    registration_id: i64,
    stream_id: i32,
    positions: Vec<(i64, Arc<dyn ReadablePosition>)>,
}

/// The conductor duty cycle.
pub struct DriverConductor {
    command_queue: ChannelReceiver<ConductorCommand>,
    receiver_proxy: ReceiverProxy,
    counters_manager: Arc<CountersManager>,
    system_counters: SystemCounters,
    client_proxy: ClientProxy,
    clock: Arc<dyn NanoClock>,
    config: DriverConfig,
    images: Vec<Arc<PublicationImage>>,
    subscriptions: Vec<SubscriptionLink>,
    next_correlation_id: i64,
}

impl DriverConductor {
    #[must_use]
    pub fn new(
        command_queue: ChannelReceiver<ConductorCommand>,
        receiver_proxy: ReceiverProxy,
        counters_manager: Arc<CountersManager>,
        system_counters: SystemCounters,
        client_proxy: ClientProxy,
        clock: Arc<dyn NanoClock>,
        config: DriverConfig,
    ) -> Self {
        Self {
            command_queue,
            receiver_proxy,
            counters_manager,
            system_counters,
            client_proxy,
            clock,
            config,
            images: Vec::new(),
            subscriptions: Vec::new(),
            next_correlation_id: 1,
        }
    }

    /// Register interest in a stream. Existing images on the stream gain a
    /// subscriber position immediately.
    pub fn add_subscription(&mut self, stream_id: i32) -> i64 {
        let registration_id = self.next_id();
        let mut link = SubscriptionLink {
            registration_id,
            stream_id,
            positions: Vec::new(),
        };

        self.receiver_proxy.on_add_subscription(stream_id);

        for image in &self.images {
            if image.stream_id() == stream_id {
                match self.allocate_subscriber_position(registration_id, image) {
                    Ok(position) => {
                        // Late joiner: consumption starts at the rebuilt
                        // prefix, not at zero.
                        position.set_ordered(image.rebuild_position());
                        let position: Arc<dyn ReadablePosition> = Arc::new(position);
                        image.add_subscriber(Arc::clone(&position));
                        link.positions.push((image.correlation_id(), position));
                    }
                    Err(e) => log::warn!(
                        "no subscriber position for image {}: {e}",
                        image.correlation_id()
                    ),
                }
            }
        }

        self.subscriptions.push(link);
        log::debug!("subscription {registration_id} added for stream {stream_id}");

        registration_id
    }

    /// Drop a subscription, detaching its positions from every image. The
    /// stream stops being dispatched once its last subscription goes.
    pub fn remove_subscription(&mut self, registration_id: i64) {
        let Some(index) = self
            .subscriptions
            .iter()
            .position(|l| l.registration_id == registration_id)
        else {
            log::warn!("remove of unknown subscription {registration_id}");
            return;
        };

        let link = self.subscriptions.swap_remove(index);
        for (correlation_id, position) in &link.positions {
            if let Some(image) = self
                .images
                .iter()
                .find(|i| i.correlation_id() == *correlation_id)
            {
                image.remove_subscriber(position);
            }
        }

        if !self
            .subscriptions
            .iter()
            .any(|l| l.stream_id == link.stream_id)
        {
            self.receiver_proxy.on_remove_subscription(link.stream_id);
        }

        log::debug!("subscription {registration_id} removed");
    }

    /// Number of live images the conductor is tracking.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// One duty cycle: drain commands, track every image's rebuild, then run
    /// lifecycle time events and reaping.
    pub fn do_work(&mut self) -> usize {
        let mut work_count = 0;

        while let Ok(command) = self.command_queue.try_recv() {
            work_count += 1;
            match command {
                ConductorCommand::CreatePublicationImage {
                    setup,
                    source_address,
                    channel_endpoint,
                } => self.on_create_publication_image(&setup, source_address, channel_endpoint),
            }
        }

        let now_ns = self.clock.nano_time();

        for image in &self.images {
            work_count += image.track_rebuild(now_ns) as usize;
        }

        work_count + self.check_managed_resources(now_ns)
    }

    fn on_create_publication_image(
        &mut self,
        setup: &Setup,
        source_address: SocketAddr,
        channel_endpoint: Arc<dyn ReceiveChannelEndpoint>,
    ) {
        let link_indices: Vec<usize> = self
            .subscriptions
            .iter()
            .enumerate()
            .filter(|(_, l)| l.stream_id == setup.stream_id)
            .map(|(i, _)| i)
            .collect();
        if link_indices.is_empty() {
            log::debug!("setup for stream {} without subscription", setup.stream_id);
            return;
        }

        let raw_log = match RawLog::allocate(setup.term_length as usize) {
            Ok(raw_log) => raw_log,
            Err(e) => {
                log::warn!(
                    "rejecting setup for session {} stream {}: {e}",
                    setup.session_id,
                    setup.stream_id
                );
                return;
            }
        };

        let correlation_id = self.next_id();

        let hwm_position = match BufferPosition::allocate(
            &self.counters_manager,
            &format!("rcv-hwm {correlation_id}"),
        ) {
            Ok(position) => position,
            Err(e) => {
                log::warn!("image {correlation_id} not created: {e}");
                return;
            }
        };
        let rebuild_position = match BufferPosition::allocate(
            &self.counters_manager,
            &format!("rcv-rebuild {correlation_id}"),
        ) {
            Ok(position) => position,
            Err(e) => {
                hwm_position.close();
                log::warn!("image {correlation_id} not created: {e}");
                return;
            }
        };

        let mut subscriber_positions: Vec<(usize, Arc<dyn ReadablePosition>)> = Vec::new();
        for link_index in link_indices {
            let registration_id = self.subscriptions[link_index].registration_id;
            let label = format!("rcv-sub {correlation_id} reg {registration_id}");
            match BufferPosition::allocate(&self.counters_manager, &label) {
                Ok(position) => {
                    let position: Arc<dyn ReadablePosition> = Arc::new(position);
                    subscriber_positions.push((link_index, position));
                }
                Err(e) => {
                    hwm_position.close();
                    rebuild_position.close();
                    for (_, position) in &subscriber_positions {
                        position.close();
                    }
                    log::warn!("image {correlation_id} not created: {e}");
                    return;
                }
            }
        }

        // Unicast: the publisher's source address doubles as the control
        // address feedback is sent to.
        let image = Arc::new(PublicationImage::new(
            ImageParams {
                correlation_id,
                image_liveness_timeout_ns: self.config.image_liveness_timeout_ns,
                channel_endpoint,
                control_address: source_address,
                source_address,
                session_id: setup.session_id,
                stream_id: setup.stream_id,
                initial_term_id: setup.initial_term_id,
                active_term_id: setup.active_term_id,
                initial_term_offset: setup.term_offset,
                initial_window_length: self.config.initial_window_length,
                raw_log,
                loss_feedback_delay_generator: Box::new(StaticDelayGenerator::new(
                    self.config.nak_delay_ns,
                    self.config.nak_delay_ns == 0,
                )),
                subscriber_positions: subscriber_positions
                    .iter()
                    .map(|(_, p)| Arc::clone(p))
                    .collect(),
                hwm_position,
                rebuild_position,
                clock: Arc::clone(&self.clock),
            },
            &self.system_counters,
        ));

        for (link_index, position) in subscriber_positions {
            self.subscriptions[link_index]
                .positions
                .push((correlation_id, position));
        }

        log::info!(
            "image {correlation_id} created: session {} stream {} from {source_address}",
            setup.session_id,
            setup.stream_id
        );

        self.images.push(Arc::clone(&image));
        self.client_proxy.on_available_image(
            correlation_id,
            setup.session_id,
            setup.stream_id,
            image.channel_uri_string(),
        );
        self.receiver_proxy.on_new_publication_image(image);
    }

    /// Time events and reaping. End-of-life images are deleted exactly once
    /// and dropped from tracking.
    fn check_managed_resources(&mut self, now_ns: i64) -> usize {
        let mut work_count = 0;
        let mut index = 0;

        while index < self.images.len() {
            let image = Arc::clone(&self.images[index]);

            match image.on_time_event(now_ns) {
                Some(ImageTimeEvent::TransitionedToLinger) => {
                    work_count += 1;
                    self.client_proxy.on_unavailable_image(
                        image.correlation_id(),
                        image.session_id(),
                        image.stream_id(),
                    );
                }
                Some(ImageTimeEvent::ReachedEndOfLife) => {
                    work_count += 1;
                }
                None => {}
            }

            if image.has_reached_end_of_life() {
                log::info!("image {} reaped", image.correlation_id());
                image.delete();

                let correlation_id = image.correlation_id();
                for link in &mut self.subscriptions {
                    link.positions.retain(|(c, _)| *c != correlation_id);
                }

                self.images.swap_remove(index);
            } else {
                index += 1;
            }
        }

        work_count
    }

    fn allocate_subscriber_position(
        &self,
        registration_id: i64,
        image: &Arc<PublicationImage>,
    ) -> Result<BufferPosition, crate::concurrent::CountersError> {
        let label = format!(
            "rcv-sub {} reg {registration_id}",
            image.correlation_id()
        );
        BufferPosition::allocate(&self.counters_manager, &label)
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_correlation_id;
        self.next_correlation_id += 1;
        id
    }
}

impl std::fmt::Debug for DriverConductor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverConductor")
            .field("images", &self.images.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
