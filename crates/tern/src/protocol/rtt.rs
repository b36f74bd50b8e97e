// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Round-trip-time measurement codec
//!
//! Echo/reply pairs between sender and receiver. The receiver decodes
//! replies and hands them to the image's RTT hook; the hook is reserved for
//! a congestion-control strategy and currently takes no action.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      frame length (40)                        |
//! +---------------+-+-------------+-------------------------------+
//! |    version    |R|    flags    |          type (0x06)          |
//! +---------------+-+-------------+-------------------------------+
//! |                          session id                           |
//! +---------------------------------------------------------------+
//! |                           stream id                           |
//! +---------------------------------------------------------------+
//! |                        echo timestamp                         |
//! |                                                               |
//! +---------------------------------------------------------------+
//! |                        reception delta                        |
//! |                                                               |
//! +---------------------------------------------------------------+
//! |                          receiver id                          |
//! |                                                               |
//! +---------------------------------------------------------------+
//! ```

use super::{
    get_i32, get_i64, put_i32, put_i64, put_prefix, EncodeError, EncodeResult, ParseError,
    ParseResult, HDR_TYPE_RTTM,
};

/// Length of an RTT measurement frame in bytes.
pub const RTT_MEASUREMENT_LENGTH: usize = 40;

/// Flag marking a frame as a reply to an echo.
pub const REPLY_FLAG: u8 = 0x80;

const SESSION_ID_FIELD_OFFSET: usize = 8;
const STREAM_ID_FIELD_OFFSET: usize = 12;
const ECHO_TIMESTAMP_FIELD_OFFSET: usize = 16;
const RECEPTION_DELTA_FIELD_OFFSET: usize = 24;
const RECEIVER_ID_FIELD_OFFSET: usize = 32;

/// Decoded RTT measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttMeasurement {
    pub session_id: i32,
    pub stream_id: i32,
    pub echo_timestamp_ns: i64,
    pub reception_delta_ns: i64,
    pub receiver_id: i64,
    pub is_reply: bool,
}

/// Encode an RTT measurement into the first [`RTT_MEASUREMENT_LENGTH`] bytes
/// of `buf`.
pub fn encode_rtt_measurement(buf: &mut [u8], rtt: &RttMeasurement) -> EncodeResult<usize> {
    if buf.len() < RTT_MEASUREMENT_LENGTH {
        return Err(EncodeError::BufferTooSmall);
    }

    let flags = if rtt.is_reply { REPLY_FLAG } else { 0 };
    put_prefix(buf, RTT_MEASUREMENT_LENGTH as i32, flags, HDR_TYPE_RTTM);
    put_i32(buf, SESSION_ID_FIELD_OFFSET, rtt.session_id);
    put_i32(buf, STREAM_ID_FIELD_OFFSET, rtt.stream_id);
    put_i64(buf, ECHO_TIMESTAMP_FIELD_OFFSET, rtt.echo_timestamp_ns);
    put_i64(buf, RECEPTION_DELTA_FIELD_OFFSET, rtt.reception_delta_ns);
    put_i64(buf, RECEIVER_ID_FIELD_OFFSET, rtt.receiver_id);

    Ok(RTT_MEASUREMENT_LENGTH)
}

/// Parse an RTT measurement from a received datagram.
pub fn parse_rtt_measurement(frame: &[u8]) -> ParseResult<RttMeasurement> {
    if frame.len() < RTT_MEASUREMENT_LENGTH {
        return Err(ParseError::TooShort {
            length: frame.len(),
            required: RTT_MEASUREMENT_LENGTH,
        });
    }

    Ok(RttMeasurement {
        session_id: get_i32(frame, SESSION_ID_FIELD_OFFSET),
        stream_id: get_i32(frame, STREAM_ID_FIELD_OFFSET),
        echo_timestamp_ns: get_i64(frame, ECHO_TIMESTAMP_FIELD_OFFSET),
        reception_delta_ns: get_i64(frame, RECEPTION_DELTA_FIELD_OFFSET),
        receiver_id: get_i64(frame, RECEIVER_ID_FIELD_OFFSET),
        is_reply: frame[super::FLAGS_FIELD_OFFSET] & REPLY_FLAG != 0,
    })
}
