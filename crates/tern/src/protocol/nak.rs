// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! NAK codec
//!
//! Negative acknowledgement requesting retransmission of a byte range within
//! one term.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      frame length (28)                        |
//! +---------------+---------------+-------------------------------+
//! |    version    |     flags     |          type (0x02)          |
//! +---------------+---------------+-------------------------------+
//! |                          session id                           |
//! +---------------------------------------------------------------+
//! |                           stream id                           |
//! +---------------------------------------------------------------+
//! |                            term id                            |
//! +---------------------------------------------------------------+
//! |                          term offset                          |
//! +---------------------------------------------------------------+
//! |                            length                             |
//! +---------------------------------------------------------------+
//! ```

use super::{
    get_i32, put_i32, put_prefix, EncodeError, EncodeResult, ParseError, ParseResult, HDR_TYPE_NAK,
};

/// Length of a NAK frame in bytes.
pub const NAK_LENGTH: usize = 28;

const SESSION_ID_FIELD_OFFSET: usize = 8;
const STREAM_ID_FIELD_OFFSET: usize = 12;
const TERM_ID_FIELD_OFFSET: usize = 16;
const TERM_OFFSET_FIELD_OFFSET: usize = 20;
const LENGTH_FIELD_OFFSET: usize = 24;

/// Decoded NAK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nak {
    pub session_id: i32,
    pub stream_id: i32,
    pub term_id: i32,
    pub term_offset: i32,
    pub length: i32,
}

/// Encode a NAK into the first [`NAK_LENGTH`] bytes of `buf`.
pub fn encode_nak(buf: &mut [u8], nak: &Nak) -> EncodeResult<usize> {
    if buf.len() < NAK_LENGTH {
        return Err(EncodeError::BufferTooSmall);
    }
    if nak.length <= 0 {
        return Err(EncodeError::InvalidParameter("non-positive nak length"));
    }

    put_prefix(buf, NAK_LENGTH as i32, 0, HDR_TYPE_NAK);
    put_i32(buf, SESSION_ID_FIELD_OFFSET, nak.session_id);
    put_i32(buf, STREAM_ID_FIELD_OFFSET, nak.stream_id);
    put_i32(buf, TERM_ID_FIELD_OFFSET, nak.term_id);
    put_i32(buf, TERM_OFFSET_FIELD_OFFSET, nak.term_offset);
    put_i32(buf, LENGTH_FIELD_OFFSET, nak.length);

    Ok(NAK_LENGTH)
}

/// Parse a NAK from a received datagram.
pub fn parse_nak(frame: &[u8]) -> ParseResult<Nak> {
    if frame.len() < NAK_LENGTH {
        return Err(ParseError::TooShort {
            length: frame.len(),
            required: NAK_LENGTH,
        });
    }

    Ok(Nak {
        session_id: get_i32(frame, SESSION_ID_FIELD_OFFSET),
        stream_id: get_i32(frame, STREAM_ID_FIELD_OFFSET),
        term_id: get_i32(frame, TERM_ID_FIELD_OFFSET),
        term_offset: get_i32(frame, TERM_OFFSET_FIELD_OFFSET),
        length: get_i32(frame, LENGTH_FIELD_OFFSET),
    })
}
