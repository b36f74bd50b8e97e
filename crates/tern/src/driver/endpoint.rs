// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receive channel endpoint
//!
//! The network edge of the receiver: one UDP socket per channel, polled
//! non-blocking from the receiver's duty cycle. Inbound frames are routed
//! through the [`DataPacketDispatcher`]; outbound feedback (status messages
//! and NAKs) is encoded here and sent to a publisher's control address.
//!
//! Send failures are logged and swallowed: feedback is periodic and
//! self-healing, and the image keeps ticking regardless.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};

use crate::protocol::{
    self, data, nak, rtt, setup, HDR_TYPE_DATA, HDR_TYPE_PAD, HDR_TYPE_RTTM, HDR_TYPE_SETUP,
};

use super::dispatcher::DataPacketDispatcher;
use super::image::PublicationImage;

/// Datagrams drained per poll before yielding back to the duty cycle.
const POLL_DATAGRAM_LIMIT: usize = 16;

/// Seam between an image and its channel's network functions.
pub trait ReceiveChannelEndpoint: Send + Sync {
    /// Send one status message datagram to a publisher's control address.
    #[allow(clippy::too_many_arguments)]
    fn send_status_message(
        &self,
        control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        window_length: i32,
        flags: u8,
    );

    /// Send one NAK datagram requesting retransmission of a range.
    fn send_nak_message(
        &self,
        control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        length: i32,
    );

    /// Detach an image from the receive dispatch fan-out.
    fn remove_publication_image(&self, image: &Arc<PublicationImage>);

    /// The URI this channel was opened with.
    fn original_uri_string(&self) -> &str;
}

/// UDP implementation of the receive side of a channel.
pub struct UdpReceiveChannelEndpoint {
    socket: UdpSocket,
    uri: String,
    bind_address: SocketAddr,
    dispatcher: DataPacketDispatcher,
}

impl UdpReceiveChannelEndpoint {
    /// Open a non-blocking UDP socket on `bind_address`, optionally joining
    /// `multicast_group` on the bound interface.
    pub fn new(
        uri: &str,
        bind_address: SocketAddr,
        multicast_group: Option<Ipv4Addr>,
        dispatcher: DataPacketDispatcher,
    ) -> io::Result<Arc<Self>> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;
        socket2.set_nonblocking(true)?;
        socket2.bind(&bind_address.into())?;

        let socket: UdpSocket = socket2.into();
        // An ephemeral bind reports port 0 until resolved by the OS.
        let bind_address = socket.local_addr().unwrap_or(bind_address);

        if let Some(group) = multicast_group {
            socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
            log::debug!("[endpoint] joined multicast group {group} on {bind_address}");
        }

        log::debug!("[endpoint] bound uri={uri} addr={bind_address}");

        Ok(Arc::new(Self {
            socket,
            uri: uri.to_string(),
            bind_address,
            dispatcher,
        }))
    }

    /// Address the endpoint's socket is bound to.
    #[must_use]
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// The routing table for this channel.
    #[must_use]
    pub fn dispatcher(&self) -> &DataPacketDispatcher {
        &self.dispatcher
    }

    /// Drain pending datagrams, routing each to the dispatcher. Returns the
    /// number of bytes received.
    pub fn poll(self: &Arc<Self>, buffer: &mut [u8]) -> usize {
        let mut bytes_received = 0;

        for _ in 0..POLL_DATAGRAM_LIMIT {
            match self.socket.recv_from(buffer) {
                Ok((length, source_address)) => {
                    bytes_received += length;
                    self.on_frame(&buffer[..length], source_address);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("[endpoint] recv failed on {}: {e}", self.bind_address);
                    break;
                }
            }
        }

        bytes_received
    }

    fn on_frame(self: &Arc<Self>, frame: &[u8], source_address: SocketAddr) {
        match protocol::frame_type(frame) {
            Some(HDR_TYPE_DATA | HDR_TYPE_PAD) => match data::parse_data_header(frame) {
                Ok(header) => {
                    self.dispatcher.on_data_packet(&header, frame);
                }
                Err(e) => log::debug!("[endpoint] bad data frame from {source_address}: {e}"),
            },
            Some(HDR_TYPE_SETUP) => match setup::parse_setup(frame) {
                Ok(setup) => {
                    let endpoint: Arc<dyn ReceiveChannelEndpoint> =
                        Arc::clone(self) as Arc<dyn ReceiveChannelEndpoint>;
                    self.dispatcher.on_setup_message(&setup, source_address, &endpoint);
                }
                Err(e) => log::debug!("[endpoint] bad setup frame from {source_address}: {e}"),
            },
            Some(HDR_TYPE_RTTM) => match rtt::parse_rtt_measurement(frame) {
                Ok(measurement) => {
                    self.dispatcher.on_rtt_measurement(&measurement, source_address);
                }
                Err(e) => log::debug!("[endpoint] bad rtt frame from {source_address}: {e}"),
            },
            Some(other) => {
                log::trace!("[endpoint] ignoring frame type 0x{other:02x} from {source_address}");
            }
            None => {
                log::debug!(
                    "[endpoint] runt datagram of {} bytes from {source_address}",
                    frame.len()
                );
            }
        }
    }
}

impl ReceiveChannelEndpoint for UdpReceiveChannelEndpoint {
    fn send_status_message(
        &self,
        control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        window_length: i32,
        flags: u8,
    ) {
        let mut frame = [0u8; protocol::status::STATUS_MESSAGE_LENGTH];
        let encoded = protocol::status::encode_status_message(
            &mut frame,
            &protocol::status::StatusMessage {
                session_id,
                stream_id,
                consumption_term_id: term_id,
                consumption_term_offset: term_offset,
                receiver_window_length: window_length,
            },
            flags,
        );

        match encoded {
            Ok(length) => {
                if let Err(e) = self.socket.send_to(&frame[..length], control_address) {
                    log::warn!("[endpoint] status message send to {control_address} failed: {e}");
                }
            }
            Err(e) => log::warn!("[endpoint] status message encode failed: {e}"),
        }
    }

    fn send_nak_message(
        &self,
        control_address: SocketAddr,
        session_id: i32,
        stream_id: i32,
        term_id: i32,
        term_offset: i32,
        length: i32,
    ) {
        let mut frame = [0u8; nak::NAK_LENGTH];
        let encoded = nak::encode_nak(
            &mut frame,
            &nak::Nak {
                session_id,
                stream_id,
                term_id,
                term_offset,
                length,
            },
        );

        match encoded {
            Ok(frame_length) => {
                if let Err(e) = self.socket.send_to(&frame[..frame_length], control_address) {
                    log::warn!("[endpoint] nak send to {control_address} failed: {e}");
                }
            }
            Err(e) => log::warn!("[endpoint] nak encode failed: {e}"),
        }
    }

    fn remove_publication_image(&self, image: &Arc<PublicationImage>) {
        self.dispatcher.remove_publication_image(image);
    }

    fn original_uri_string(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Debug for UdpReceiveChannelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpReceiveChannelEndpoint")
            .field("uri", &self.uri)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}
