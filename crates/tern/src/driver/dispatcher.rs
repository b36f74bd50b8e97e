// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data packet dispatch
//!
//! Routes inbound frames for one channel to the image owning the
//! (session, stream) flow. A setup frame for a subscribed stream with no
//! image yet is forwarded to the conductor exactly once; the flow is marked
//! pending until the conductor registers the created image.
//!
//! All mutation arrives on the receiver thread (subscription changes come
//! through its command queue); concurrent maps keep the tables safe to
//! inspect from other threads for diagnostics.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::protocol::data::DataHeader;
use crate::protocol::rtt::RttMeasurement;
use crate::protocol::setup::Setup;
use crate::protocol::FRAME_ALIGNMENT;

use super::conductor::ConductorProxy;
use super::endpoint::ReceiveChannelEndpoint;
use super::image::PublicationImage;

/// Per-channel routing of inbound frames to publication images.
pub struct DataPacketDispatcher {
    conductor_proxy: ConductorProxy,
    subscribed_streams: DashSet<i32>,
    images: DashMap<(i32, i32), Arc<PublicationImage>>,
    pending_setups: DashSet<(i32, i32)>,
}

impl DataPacketDispatcher {
    #[must_use]
    pub fn new(conductor_proxy: ConductorProxy) -> Self {
        Self {
            conductor_proxy,
            subscribed_streams: DashSet::new(),
            images: DashMap::new(),
            pending_setups: DashSet::new(),
        }
    }

    /// Start accepting setups and data for a stream.
    pub fn add_subscription(&self, stream_id: i32) {
        self.subscribed_streams.insert(stream_id);
    }

    /// Stop accepting a stream; existing images stop routing immediately.
    pub fn remove_subscription(&self, stream_id: i32) {
        self.subscribed_streams.remove(&stream_id);
        self.images.retain(|(s, _), _| *s != stream_id);
        self.pending_setups.retain(|(s, _)| *s != stream_id);
    }

    /// Register a created image for routing and promote it to ACTIVE.
    /// Called from the receiver thread when the conductor hands the image
    /// over.
    pub fn add_publication_image(&self, image: Arc<PublicationImage>) {
        let key = (image.stream_id(), image.session_id());
        self.pending_setups.remove(&key);
        image.set_status(super::image::ImageStatus::Active);
        self.images.insert(key, image);
    }

    /// Detach an image so no further packets are delivered to it.
    pub fn remove_publication_image(&self, image: &Arc<PublicationImage>) {
        let key = (image.stream_id(), image.session_id());
        // The map guard must be released before mutating the shard.
        let is_registered = self
            .images
            .get(&key)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), image));

        if is_registered {
            self.images.remove(&key);
        }
    }

    /// Number of images currently routed.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Route a data frame to its image. Returns bytes applied.
    pub fn on_data_packet(&self, header: &DataHeader, frame: &[u8]) -> usize {
        let key = (header.stream_id, header.session_id);

        if let Some(image) = self.images.get(&key) {
            let term_length = image.raw_log().term_length();
            let term_offset = header.term_offset;

            if term_offset < 0
                || term_offset as usize % FRAME_ALIGNMENT != 0
                || term_offset as usize + frame.len() > term_length
            {
                log::warn!(
                    "dropping data frame with bad offset {} length {} for stream {} session {}",
                    term_offset,
                    frame.len(),
                    header.stream_id,
                    header.session_id
                );
                return 0;
            }

            return image.insert_packet(header.term_id, term_offset, frame);
        }

        0
    }

    /// Handle a setup frame: request image creation for the first setup of a
    /// subscribed, unknown flow.
    pub fn on_setup_message(
        &self,
        setup: &Setup,
        source_address: SocketAddr,
        channel_endpoint: &Arc<dyn ReceiveChannelEndpoint>,
    ) {
        let key = (setup.stream_id, setup.session_id);

        if !self.subscribed_streams.contains(&setup.stream_id) || self.images.contains_key(&key) {
            return;
        }

        // First setup wins; duplicates while creation is in flight are
        // dropped here.
        if self.pending_setups.insert(key) {
            log::debug!(
                "setup for stream {} session {} from {source_address}; requesting image",
                setup.stream_id,
                setup.session_id
            );
            self.conductor_proxy.create_publication_image(
                *setup,
                source_address,
                Arc::clone(channel_endpoint),
            );
        }
    }

    /// Route an RTT measurement reply to its image's reserved hook.
    pub fn on_rtt_measurement(&self, measurement: &RttMeasurement, source_address: SocketAddr) {
        if !measurement.is_reply {
            return;
        }

        let key = (measurement.stream_id, measurement.session_id);
        if let Some(image) = self.images.get(&key) {
            image.on_rtt_measurement(measurement, source_address);
        }
    }
}

impl std::fmt::Debug for DataPacketDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPacketDispatcher")
            .field("subscribed_streams", &self.subscribed_streams.len())
            .field("images", &self.images.len())
            .field("pending_setups", &self.pending_setups.len())
            .finish()
    }
}
