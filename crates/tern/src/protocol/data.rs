// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data frame header codec
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        frame length                           |
//! +---------------+-+-+-----------+-------------------------------+
//! |    version    |B|E|   flags   |          type (0x01)          |
//! +---------------+-+-+-----------+-------------------------------+
//! |                          term offset                          |
//! +---------------------------------------------------------------+
//! |                          session id                           |
//! +---------------------------------------------------------------+
//! |                           stream id                           |
//! +---------------------------------------------------------------+
//! |                            term id                            |
//! +---------------------------------------------------------------+
//! |                         reserved value                        |
//! |                                                               |
//! +---------------------------------------------------------------+
//! ```
//!
//! A *heartbeat* is a data frame of exactly one header whose on-wire frame
//! length word is zero: it advertises the sender's position without payload
//! and must never be written into a term.

use super::{
    get_i32, get_i64, put_i32, put_i64, put_prefix, EncodeError, EncodeResult, ParseError,
    ParseResult, HDR_TYPE_DATA,
};

/// Length of the data frame header in bytes.
pub const HEADER_LENGTH: usize = 32;

/// Flag for the first frame of a fragmented message.
pub const BEGIN_FLAG: u8 = 0x80;
/// Flag for the last frame of a fragmented message.
pub const END_FLAG: u8 = 0x40;
/// Flags for an unfragmented message.
pub const UNFRAGMENTED: u8 = BEGIN_FLAG | END_FLAG;

const TERM_OFFSET_FIELD_OFFSET: usize = 8;
const SESSION_ID_FIELD_OFFSET: usize = 12;
const STREAM_ID_FIELD_OFFSET: usize = 16;
const TERM_ID_FIELD_OFFSET: usize = 20;
const RESERVED_VALUE_FIELD_OFFSET: usize = 24;

/// Decoded data frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub frame_length: i32,
    pub flags: u8,
    pub term_offset: i32,
    pub session_id: i32,
    pub stream_id: i32,
    pub term_id: i32,
    pub reserved_value: i64,
}

/// Encode a data frame header into the first [`HEADER_LENGTH`] bytes of
/// `buf`.
pub fn encode_data_header(buf: &mut [u8], header: &DataHeader) -> EncodeResult<usize> {
    if buf.len() < HEADER_LENGTH {
        return Err(EncodeError::BufferTooSmall);
    }
    if header.term_offset < 0 {
        return Err(EncodeError::InvalidParameter("negative term offset"));
    }

    put_prefix(buf, header.frame_length, header.flags, HDR_TYPE_DATA);
    put_i32(buf, TERM_OFFSET_FIELD_OFFSET, header.term_offset);
    put_i32(buf, SESSION_ID_FIELD_OFFSET, header.session_id);
    put_i32(buf, STREAM_ID_FIELD_OFFSET, header.stream_id);
    put_i32(buf, TERM_ID_FIELD_OFFSET, header.term_id);
    put_i64(buf, RESERVED_VALUE_FIELD_OFFSET, header.reserved_value);

    Ok(HEADER_LENGTH)
}

/// Parse a data frame header from a received datagram.
pub fn parse_data_header(frame: &[u8]) -> ParseResult<DataHeader> {
    if frame.len() < HEADER_LENGTH {
        return Err(ParseError::TooShort {
            length: frame.len(),
            required: HEADER_LENGTH,
        });
    }

    Ok(DataHeader {
        frame_length: get_i32(frame, super::FRAME_LENGTH_FIELD_OFFSET),
        flags: frame[super::FLAGS_FIELD_OFFSET],
        term_offset: get_i32(frame, TERM_OFFSET_FIELD_OFFSET),
        session_id: get_i32(frame, SESSION_ID_FIELD_OFFSET),
        stream_id: get_i32(frame, STREAM_ID_FIELD_OFFSET),
        term_id: get_i32(frame, TERM_ID_FIELD_OFFSET),
        reserved_value: get_i64(frame, RESERVED_VALUE_FIELD_OFFSET),
    })
}

/// Whether a received data frame is a heartbeat: header-only length and a
/// zero frame-length word on the wire.
#[must_use]
pub fn is_heartbeat(frame: &[u8]) -> bool {
    frame.len() == HEADER_LENGTH && frame[0..4] == [0, 0, 0, 0]
}

/// Build a heartbeat frame for a `(session, stream, term, offset)` tuple.
pub fn encode_heartbeat(
    buf: &mut [u8],
    session_id: i32,
    stream_id: i32,
    term_id: i32,
    term_offset: i32,
) -> EncodeResult<usize> {
    let written = encode_data_header(
        buf,
        &DataHeader {
            frame_length: 0,
            flags: UNFRAGMENTED,
            term_offset,
            session_id,
            stream_id,
            term_id,
            reserved_value: 0,
        },
    )?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = DataHeader {
            frame_length: 1056,
            flags: UNFRAGMENTED,
            term_offset: 4096,
            session_id: -2,
            stream_id: 1001,
            term_id: 7,
            reserved_value: -1,
        };

        let mut buf = [0u8; HEADER_LENGTH];
        assert_eq!(
            encode_data_header(&mut buf, &header).expect("fits"),
            HEADER_LENGTH
        );
        assert_eq!(parse_data_header(&buf).expect("valid"), header);
    }

    #[test]
    fn test_golden_bytes() {
        let mut buf = [0u8; HEADER_LENGTH];
        encode_data_header(
            &mut buf,
            &DataHeader {
                frame_length: 64,
                flags: UNFRAGMENTED,
                term_offset: 32,
                session_id: 1,
                stream_id: 2,
                term_id: 3,
                reserved_value: 0,
            },
        )
        .expect("fits");

        assert_eq!(&buf[0..4], &[0x40, 0x00, 0x00, 0x00]); // frame length 64
        assert_eq!(buf[4], 0x00); // version
        assert_eq!(buf[5], 0xC0); // begin | end
        assert_eq!(&buf[6..8], &[0x01, 0x00]); // type DATA
        assert_eq!(&buf[8..12], &[0x20, 0x00, 0x00, 0x00]); // term offset 32
        assert_eq!(&buf[12..16], &[0x01, 0x00, 0x00, 0x00]); // session
        assert_eq!(&buf[16..20], &[0x02, 0x00, 0x00, 0x00]); // stream
        assert_eq!(&buf[20..24], &[0x03, 0x00, 0x00, 0x00]); // term
    }

    #[test]
    fn test_heartbeat_detection() {
        let mut buf = [0u8; HEADER_LENGTH];
        encode_heartbeat(&mut buf, 1, 2, 7, 2048).expect("fits");

        assert!(is_heartbeat(&buf));

        // A full data frame is not a heartbeat.
        let mut data = [0u8; HEADER_LENGTH + 8];
        encode_data_header(
            &mut data,
            &DataHeader {
                frame_length: (HEADER_LENGTH + 8) as i32,
                flags: UNFRAGMENTED,
                term_offset: 0,
                session_id: 1,
                stream_id: 2,
                term_id: 7,
                reserved_value: 0,
            },
        )
        .expect("fits");
        assert!(!is_heartbeat(&data));

        // Header-only length but non-zero length word is not a heartbeat.
        assert!(!is_heartbeat(&data[..HEADER_LENGTH]));
    }

    #[test]
    fn test_rejects_short_buffers() {
        let mut buf = [0u8; 16];
        let header = DataHeader {
            frame_length: 32,
            flags: 0,
            term_offset: 0,
            session_id: 0,
            stream_id: 0,
            term_id: 0,
            reserved_value: 0,
        };

        assert_eq!(
            encode_data_header(&mut buf, &header),
            Err(EncodeError::BufferTooSmall)
        );
        assert!(matches!(
            parse_data_header(&buf),
            Err(ParseError::TooShort { .. })
        ));
    }
}
