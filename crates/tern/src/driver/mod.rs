// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The media-driver core: images, loss handling, and the two agents
//!
//! ## Thread model
//!
//! ```text
//!   network ----> Receiver agent ----------------+
//!                 poll / insert_packet           |
//!                 send status messages + NAKs    |   shared positions,
//!                 liveness watch                 |   term buffers,
//!                                                |   seqlock loss handoff
//!   timers -----> DriverConductor agent ---------+
//!                 create images from setups
//!                 track_rebuild / time events
//!                 subscriptions, reaping, client events
//! ```
//!
//! Neither agent blocks; every tick returns a work count. Cross-thread state
//! lives in [`PublicationImage`] behind single-writer atomics.

mod client_proxy;
mod conductor;
mod dispatcher;
mod endpoint;
mod feedback;
mod image;
mod loss_detector;
mod receiver;
mod system_counters;

pub use client_proxy::{ClientProxy, ON_AVAILABLE_IMAGE, ON_UNAVAILABLE_IMAGE};
pub use conductor::{conductor_channel, ConductorCommand, ConductorProxy, DriverConductor};
pub use dispatcher::DataPacketDispatcher;
pub use endpoint::{ReceiveChannelEndpoint, UdpReceiveChannelEndpoint};
pub use feedback::{FeedbackDelayGenerator, StaticDelayGenerator};
pub use image::{ImageParams, ImageStatus, ImageTimeEvent, PublicationImage};
pub use loss_detector::{rebuild_offset, work_count, GapHandler, LossDetector};
pub use receiver::{receiver_channel, Receiver, ReceiverCommand, ReceiverProxy};
pub use system_counters::{SystemCounterDescriptor, SystemCounters};
