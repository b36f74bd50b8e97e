// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status message codec
//!
//! Receiver feedback to a sender: the consumption point and how much the
//! receiver is prepared to accept beyond it.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      frame length (28)                        |
//! +---------------+---------------+-------------------------------+
//! |    version    |     flags     |          type (0x03)          |
//! +---------------+---------------+-------------------------------+
//! |                          session id                           |
//! +---------------------------------------------------------------+
//! |                           stream id                           |
//! +---------------------------------------------------------------+
//! |                     consumption term id                       |
//! +---------------------------------------------------------------+
//! |                   consumption term offset                     |
//! +---------------------------------------------------------------+
//! |                        receiver window                        |
//! +---------------------------------------------------------------+
//! ```

use super::{
    get_i32, put_i32, put_prefix, EncodeError, EncodeResult, ParseError, ParseResult, HDR_TYPE_SM,
};

/// Length of a status message frame in bytes.
pub const STATUS_MESSAGE_LENGTH: usize = 28;

const SESSION_ID_FIELD_OFFSET: usize = 8;
const STREAM_ID_FIELD_OFFSET: usize = 12;
const CONSUMPTION_TERM_ID_FIELD_OFFSET: usize = 16;
const CONSUMPTION_TERM_OFFSET_FIELD_OFFSET: usize = 20;
const RECEIVER_WINDOW_FIELD_OFFSET: usize = 24;

/// Decoded status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub session_id: i32,
    pub stream_id: i32,
    pub consumption_term_id: i32,
    pub consumption_term_offset: i32,
    pub receiver_window_length: i32,
}

/// Encode a status message into the first [`STATUS_MESSAGE_LENGTH`] bytes of
/// `buf`.
pub fn encode_status_message(
    buf: &mut [u8],
    sm: &StatusMessage,
    flags: u8,
) -> EncodeResult<usize> {
    if buf.len() < STATUS_MESSAGE_LENGTH {
        return Err(EncodeError::BufferTooSmall);
    }
    if sm.receiver_window_length < 0 {
        return Err(EncodeError::InvalidParameter("negative receiver window"));
    }

    put_prefix(buf, STATUS_MESSAGE_LENGTH as i32, flags, HDR_TYPE_SM);
    put_i32(buf, SESSION_ID_FIELD_OFFSET, sm.session_id);
    put_i32(buf, STREAM_ID_FIELD_OFFSET, sm.stream_id);
    put_i32(buf, CONSUMPTION_TERM_ID_FIELD_OFFSET, sm.consumption_term_id);
    put_i32(
        buf,
        CONSUMPTION_TERM_OFFSET_FIELD_OFFSET,
        sm.consumption_term_offset,
    );
    put_i32(buf, RECEIVER_WINDOW_FIELD_OFFSET, sm.receiver_window_length);

    Ok(STATUS_MESSAGE_LENGTH)
}

/// Parse a status message from a received datagram.
pub fn parse_status_message(frame: &[u8]) -> ParseResult<StatusMessage> {
    if frame.len() < STATUS_MESSAGE_LENGTH {
        return Err(ParseError::TooShort {
            length: frame.len(),
            required: STATUS_MESSAGE_LENGTH,
        });
    }

    Ok(StatusMessage {
        session_id: get_i32(frame, SESSION_ID_FIELD_OFFSET),
        stream_id: get_i32(frame, STREAM_ID_FIELD_OFFSET),
        consumption_term_id: get_i32(frame, CONSUMPTION_TERM_ID_FIELD_OFFSET),
        consumption_term_offset: get_i32(frame, CONSUMPTION_TERM_OFFSET_FIELD_OFFSET),
        receiver_window_length: get_i32(frame, RECEIVER_WINDOW_FIELD_OFFSET),
    })
}
