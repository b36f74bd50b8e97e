// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # TERN - high-throughput UDP messaging transport driver
//!
//! The receiver half of a unicast/multicast messaging transport: it
//! reassembles ordered byte streams out of unreliable datagrams, feeds flow
//! control back to senders, requests retransmission of lost ranges, and
//! announces stream availability to client processes.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                         Client processes                           |
//! |     subscriber positions <- counters buffer | broadcast events     |
//! +--------------------------------------------------------------------+
//! |                           Driver layer                             |
//! |  Receiver agent | DriverConductor agent | PublicationImage state   |
//! +--------------------------------------------------------------------+
//! |                          Reassembly layer                          |
//! |  term-buffer trio | term rebuilder | gap scanner | loss detector   |
//! +--------------------------------------------------------------------+
//! |                          Transport layer                           |
//! |      UDP unicast / multicast endpoints | wire frame codecs         |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PublicationImage`] | Per-(channel, session, stream) reception state |
//! | [`Receiver`] | Network ingress and periodic feedback duty cycle |
//! | [`DriverConductor`] | Lifecycle, loss dispatch, and buffer hygiene |
//! | [`UdpReceiveChannelEndpoint`] | Channel socket and frame routing |
//! | [`DriverConfig`] | Validated driver tunables |
//!
//! ## Design points
//!
//! - **Wait-free hot paths.** Position counters are single-writer 64-bit
//!   slots published with release stores; frames publish through a released
//!   header word; the loss handoff is a seqlock the receiver never blocks
//!   on.
//! - **Flow control follows the slowest subscriber.** Status messages
//!   advertise `min(subscriber positions)` with gain hysteresis.
//! - **Failure is a counter, not an exception.** Under-runs, over-runs, and
//!   every feedback message land in shared counters observable by external
//!   tooling.

/// Shared atomic buffers, the term-buffer trio, and rebuild primitives.
pub mod buffer;
/// Driver constants and validated runtime configuration.
pub mod config;
/// Clocks, positions, counters, and the client broadcast ring.
pub mod concurrent;
/// The media-driver core: images, agents, dispatch, loss handling.
pub mod driver;
/// Byte-exact wire frame codecs.
pub mod protocol;

pub use config::DriverConfig;
pub use driver::{
    DriverConductor, ImageStatus, PublicationImage, Receiver, UdpReceiveChannelEndpoint,
};
