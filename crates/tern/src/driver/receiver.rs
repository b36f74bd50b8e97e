// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receiver agent
//!
//! One long-lived cooperative duty cycle owning network ingress and per-image
//! feedback: drain conductor commands, poll the endpoint, then for each live
//! image send pending status messages and pending NAKs. An image that misses
//! its liveness window is retired from dispatch and marked INACTIVE; the
//! conductor takes the lifecycle from there.
//!
//! Non-blocking throughout; the returned work count lets an outer scheduler
//! idle-strategy-sleep.

use std::sync::Arc;

use crossbeam_channel::{Receiver as ChannelReceiver, Sender, TrySendError};

use crate::concurrent::NanoClock;
use crate::config::DriverConfig;

use super::endpoint::UdpReceiveChannelEndpoint;
use super::image::PublicationImage;

/// Commands handed from the conductor to the receiver.
pub enum ReceiverCommand {
    /// Track and dispatch a newly created image.
    NewPublicationImage(Arc<PublicationImage>),
    /// Accept setups and data for a stream.
    AddSubscription(i32),
    /// Stop accepting a stream.
    RemoveSubscription(i32),
}

/// Conductor-side handle for posting [`ReceiverCommand`]s.
#[derive(Clone)]
pub struct ReceiverProxy {
    sender: Sender<ReceiverCommand>,
}

impl ReceiverProxy {
    pub fn on_new_publication_image(&self, image: Arc<PublicationImage>) {
        self.send(ReceiverCommand::NewPublicationImage(image));
    }

    pub fn on_add_subscription(&self, stream_id: i32) {
        self.send(ReceiverCommand::AddSubscription(stream_id));
    }

    pub fn on_remove_subscription(&self, stream_id: i32) {
        self.send(ReceiverCommand::RemoveSubscription(stream_id));
    }

    fn send(&self, command: ReceiverCommand) {
        if let Err(TrySendError::Disconnected(_)) = self.sender.try_send(command) {
            log::warn!("receiver command dropped: receiver has shut down");
        }
    }
}

/// Create the conductor-to-receiver command channel.
#[must_use]
pub fn receiver_channel() -> (ReceiverProxy, ChannelReceiver<ReceiverCommand>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (ReceiverProxy { sender }, receiver)
}

/// The receiver duty cycle.
pub struct Receiver {
    command_queue: ChannelReceiver<ReceiverCommand>,
    endpoint: Arc<UdpReceiveChannelEndpoint>,
    images: Vec<Arc<PublicationImage>>,
    clock: Arc<dyn NanoClock>,
    status_message_timeout_ns: i64,
    receive_buffer: Vec<u8>,
}

impl Receiver {
    #[must_use]
    pub fn new(
        command_queue: ChannelReceiver<ReceiverCommand>,
        endpoint: Arc<UdpReceiveChannelEndpoint>,
        clock: Arc<dyn NanoClock>,
        config: &DriverConfig,
    ) -> Self {
        Self {
            command_queue,
            endpoint,
            images: Vec::new(),
            clock,
            status_message_timeout_ns: config.status_message_timeout_ns,
            receive_buffer: vec![0u8; config.mtu_length],
        }
    }

    /// Number of images the receiver is ticking.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// One duty cycle. Returns the work done so the scheduler can idle.
    pub fn do_work(&mut self) -> usize {
        let mut work_count = 0;

        while let Ok(command) = self.command_queue.try_recv() {
            work_count += 1;
            self.on_command(command);
        }

        let endpoint = Arc::clone(&self.endpoint);
        work_count += endpoint.poll(&mut self.receive_buffer);

        let now_ns = self.clock.nano_time();
        let mut index = 0;
        while index < self.images.len() {
            let image = Arc::clone(&self.images[index]);

            if image.check_for_activity(now_ns) {
                work_count +=
                    image.send_pending_status_message(now_ns, self.status_message_timeout_ns)
                        as usize;
                work_count += image.process_pending_loss() as usize;
                index += 1;
            } else {
                log::debug!(
                    "image {} went inactive: no packets within liveness timeout",
                    image.correlation_id()
                );
                image.remove_from_dispatcher();
                image.if_active_go_inactive();
                self.images.swap_remove(index);
            }
        }

        work_count
    }

    fn on_command(&mut self, command: ReceiverCommand) {
        match command {
            ReceiverCommand::NewPublicationImage(image) => {
                self.endpoint
                    .dispatcher()
                    .add_publication_image(Arc::clone(&image));
                self.images.push(image);
            }
            ReceiverCommand::AddSubscription(stream_id) => {
                self.endpoint.dispatcher().add_subscription(stream_id);
            }
            ReceiverCommand::RemoveSubscription(stream_id) => {
                self.endpoint.dispatcher().remove_subscription(stream_id);
            }
        }
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("images", &self.images.len())
            .finish()
    }
}
