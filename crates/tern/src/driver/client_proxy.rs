// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client notifications
//!
//! The conductor announces image availability changes to client processes
//! through the broadcast ring. Events are small fixed layouts, little-endian:
//!
//! ```text
//! AVAILABLE_IMAGE     correlation i64 | session i32 | stream i32 |
//!                     uri length i32 | uri bytes
//! UNAVAILABLE_IMAGE   correlation i64 | session i32 | stream i32
//! ```
//!
//! A full ring loses events for slow clients, never the conductor; transmit
//! failures are logged and dropped.

use crate::concurrent::BroadcastTransmitter;

/// Event type id for a newly available image.
pub const ON_AVAILABLE_IMAGE: i32 = 0x01;
/// Event type id for an image leaving service.
pub const ON_UNAVAILABLE_IMAGE: i32 = 0x02;

/// Conductor-side writer of client events.
pub struct ClientProxy {
    transmitter: BroadcastTransmitter,
    scratch: Vec<u8>,
}

impl ClientProxy {
    #[must_use]
    pub fn new(transmitter: BroadcastTransmitter) -> Self {
        Self {
            transmitter,
            scratch: Vec::with_capacity(256),
        }
    }

    /// Announce a newly created image.
    pub fn on_available_image(
        &mut self,
        correlation_id: i64,
        session_id: i32,
        stream_id: i32,
        channel_uri: &str,
    ) {
        self.scratch.clear();
        self.scratch.extend_from_slice(&correlation_id.to_le_bytes());
        self.scratch.extend_from_slice(&session_id.to_le_bytes());
        self.scratch.extend_from_slice(&stream_id.to_le_bytes());
        self.scratch
            .extend_from_slice(&(channel_uri.len() as i32).to_le_bytes());
        self.scratch.extend_from_slice(channel_uri.as_bytes());

        if let Err(e) = self.transmitter.transmit(ON_AVAILABLE_IMAGE, &self.scratch) {
            log::warn!("available-image broadcast dropped: {e}");
        }
    }

    /// Announce an image that has left service.
    pub fn on_unavailable_image(&mut self, correlation_id: i64, session_id: i32, stream_id: i32) {
        self.scratch.clear();
        self.scratch.extend_from_slice(&correlation_id.to_le_bytes());
        self.scratch.extend_from_slice(&session_id.to_le_bytes());
        self.scratch.extend_from_slice(&stream_id.to_le_bytes());

        if let Err(e) = self.transmitter.transmit(ON_UNAVAILABLE_IMAGE, &self.scratch) {
            log::warn!("unavailable-image broadcast dropped: {e}");
        }
    }
}

impl std::fmt::Debug for ClientProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientProxy").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AtomicBuffer;
    use crate::concurrent::TRAILER_LENGTH;

    fn proxy_with_buffer() -> (ClientProxy, AtomicBuffer) {
        let buffer = AtomicBuffer::allocate(1024 + TRAILER_LENGTH);
        let transmitter = BroadcastTransmitter::new(buffer.clone()).expect("valid capacity");
        (ClientProxy::new(transmitter), buffer)
    }

    #[test]
    fn test_available_image_layout() {
        let (mut proxy, buffer) = proxy_with_buffer();

        proxy.on_available_image(42, 11, 1001, "udp://239.255.0.1:40456");

        // Record header: msg type at offset 16, message at 24.
        assert_eq!(buffer.get_i32(16), ON_AVAILABLE_IMAGE);
        assert_eq!(buffer.get_i64(24), 42);
        assert_eq!(buffer.get_i32(32), 11);
        assert_eq!(buffer.get_i32(36), 1001);
        assert_eq!(buffer.get_i32(40), 23);

        let mut uri = vec![0u8; 23];
        buffer.get_bytes(44, &mut uri);
        assert_eq!(&uri, b"udp://239.255.0.1:40456");
    }

    #[test]
    fn test_unavailable_image_layout() {
        let (mut proxy, buffer) = proxy_with_buffer();

        proxy.on_unavailable_image(42, 11, 1001);

        assert_eq!(buffer.get_i32(12), 16); // message length
        assert_eq!(buffer.get_i32(16), ON_UNAVAILABLE_IMAGE);
        assert_eq!(buffer.get_i64(24), 42);
        assert_eq!(buffer.get_i32(32), 11);
        assert_eq!(buffer.get_i32(36), 1001);
    }
}
