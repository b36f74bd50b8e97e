// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Driver configuration - single source of truth
//!
//! Every tunable the driver consumes lives here: defaults as documented
//! constants, runtime values in [`DriverConfig`]. Never hardcode these
//! elsewhere.

use std::fmt;

use crate::buffer::TERM_MAX_LENGTH;
use crate::concurrent::{COUNTER_LENGTH, TRAILER_LENGTH};
use crate::protocol::data::HEADER_LENGTH;

/// Default length of a single term buffer (16 MiB).
///
/// Receivers take the term length from the stream's setup frame; this
/// default applies to validation and tooling.
pub const TERM_BUFFER_LENGTH_DEFAULT: usize = 16 * 1024 * 1024;

/// Default initial flow-control window advertised to senders (128 KiB).
///
/// The effective window is `min(term_length / 2, initial_window)`; the gain
/// governing status-message hysteresis is a quarter of the window.
pub const INITIAL_WINDOW_LENGTH_DEFAULT: i32 = 128 * 1024;

/// Default liveness timeout for an image (10 s).
///
/// No packets for this long moves an image ACTIVE -> INACTIVE; the same
/// interval bounds the INACTIVE and LINGER stages.
pub const IMAGE_LIVENESS_TIMEOUT_DEFAULT_NS: i64 = 10_000_000_000;

/// Default status-message keepalive interval (200 ms).
///
/// A status message is sent when the announced position moves, and at least
/// this often while the image is ACTIVE.
pub const STATUS_MESSAGE_TIMEOUT_DEFAULT_NS: i64 = 200_000_000;

/// Default delay between gap discovery and NAK emission (60 ms).
///
/// Re-armed after each NAK until the gap fills. Zero with immediate
/// feedback suits unicast; a randomized generator suits multicast.
pub const NAK_DELAY_DEFAULT_NS: i64 = 60_000_000;

/// Default maximum datagram payload (4 KiB).
pub const MTU_LENGTH_DEFAULT: usize = 4096;

/// Default counters values buffer length (1 MiB; 8192 counter slots).
pub const COUNTERS_BUFFER_LENGTH_DEFAULT: usize = 1024 * 1024;

/// Default client event broadcast buffer capacity, excluding its trailer
/// (128 KiB).
pub const BROADCAST_BUFFER_LENGTH_DEFAULT: usize = 128 * 1024;

/// Validated runtime configuration for a driver instance.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Flow-control window before clamping to half a term.
    pub initial_window_length: i32,
    /// Image liveness timeout in nanoseconds.
    pub image_liveness_timeout_ns: i64,
    /// Status-message keepalive in nanoseconds.
    pub status_message_timeout_ns: i64,
    /// Loss feedback delay in nanoseconds.
    pub nak_delay_ns: i64,
    /// Maximum datagram length accepted or sent.
    pub mtu_length: usize,
    /// Length of the counters values buffer.
    pub counters_buffer_length: usize,
    /// Capacity of the client broadcast ring (power of two, trailer not
    /// included).
    pub broadcast_buffer_length: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            initial_window_length: INITIAL_WINDOW_LENGTH_DEFAULT,
            image_liveness_timeout_ns: IMAGE_LIVENESS_TIMEOUT_DEFAULT_NS,
            status_message_timeout_ns: STATUS_MESSAGE_TIMEOUT_DEFAULT_NS,
            nak_delay_ns: NAK_DELAY_DEFAULT_NS,
            mtu_length: MTU_LENGTH_DEFAULT,
            counters_buffer_length: COUNTERS_BUFFER_LENGTH_DEFAULT,
            broadcast_buffer_length: BROADCAST_BUFFER_LENGTH_DEFAULT,
        }
    }
}

impl DriverConfig {
    /// Check the configuration for internally consistent values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_window_length <= 0 {
            return Err(ConfigError::NonPositive("initial_window_length"));
        }
        if self.initial_window_length as usize > TERM_MAX_LENGTH / 2 {
            // Per image the window clamps to half its term; a value no term
            // can honor is a misconfiguration, not something to clamp.
            return Err(ConfigError::WindowExceedsTerm(self.initial_window_length));
        }
        if self.image_liveness_timeout_ns <= 0 {
            return Err(ConfigError::NonPositive("image_liveness_timeout_ns"));
        }
        if self.status_message_timeout_ns <= 0 {
            return Err(ConfigError::NonPositive("status_message_timeout_ns"));
        }
        if self.nak_delay_ns < 0 {
            return Err(ConfigError::NonPositive("nak_delay_ns"));
        }
        if self.mtu_length <= HEADER_LENGTH {
            return Err(ConfigError::MtuTooSmall(self.mtu_length));
        }
        if self.counters_buffer_length < COUNTER_LENGTH * 8 {
            return Err(ConfigError::CountersBufferTooSmall(
                self.counters_buffer_length,
            ));
        }
        if !self.broadcast_buffer_length.is_power_of_two() {
            return Err(ConfigError::BroadcastNotPowerOfTwo(
                self.broadcast_buffer_length,
            ));
        }

        Ok(())
    }

    /// Total allocation for the broadcast ring, trailer included.
    #[must_use]
    pub fn broadcast_total_length(&self) -> usize {
        self.broadcast_buffer_length + TRAILER_LENGTH
    }
}

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value that must be positive is not.
    NonPositive(&'static str),
    /// Window cannot fit within half of any legal term.
    WindowExceedsTerm(i32),
    /// MTU leaves no room for payload.
    MtuTooSmall(usize),
    /// Counters buffer below the minimum slot count.
    CountersBufferTooSmall(usize),
    /// Broadcast ring capacity must be a power of two.
    BroadcastNotPowerOfTwo(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive(field) => write!(f, "{field} must be positive"),
            Self::WindowExceedsTerm(window) => {
                write!(f, "initial window {window} cannot fit within half a term")
            }
            Self::MtuTooSmall(mtu) => write!(f, "mtu {mtu} leaves no payload room"),
            Self::CountersBufferTooSmall(len) => {
                write!(f, "counters buffer of {len} bytes below minimum")
            }
            Self::BroadcastNotPowerOfTwo(len) => {
                write!(f, "broadcast capacity {len} is not a power of two")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
