// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Setup frame codec
//!
//! A sender announces a new stream, its term geometry and current write
//! point, so receivers can allocate reception state before data arrives.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      frame length (36)                        |
//! +---------------+---------------+-------------------------------+
//! |    version    |     flags     |          type (0x05)          |
//! +---------------+---------------+-------------------------------+
//! |                          term offset                          |
//! +---------------------------------------------------------------+
//! |                          session id                           |
//! +---------------------------------------------------------------+
//! |                           stream id                           |
//! +---------------------------------------------------------------+
//! |                        initial term id                        |
//! +---------------------------------------------------------------+
//! |                         active term id                        |
//! +---------------------------------------------------------------+
//! |                          term length                          |
//! +---------------------------------------------------------------+
//! |                              mtu                              |
//! +---------------------------------------------------------------+
//! ```

use super::{
    get_i32, put_i32, put_prefix, EncodeError, EncodeResult, ParseError, ParseResult,
    HDR_TYPE_SETUP,
};

/// Length of a setup frame in bytes.
pub const SETUP_LENGTH: usize = 36;

const TERM_OFFSET_FIELD_OFFSET: usize = 8;
const SESSION_ID_FIELD_OFFSET: usize = 12;
const STREAM_ID_FIELD_OFFSET: usize = 16;
const INITIAL_TERM_ID_FIELD_OFFSET: usize = 20;
const ACTIVE_TERM_ID_FIELD_OFFSET: usize = 24;
const TERM_LENGTH_FIELD_OFFSET: usize = 28;
const MTU_FIELD_OFFSET: usize = 32;

/// Decoded setup frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setup {
    pub term_offset: i32,
    pub session_id: i32,
    pub stream_id: i32,
    pub initial_term_id: i32,
    pub active_term_id: i32,
    pub term_length: i32,
    pub mtu: i32,
}

/// Encode a setup frame into the first [`SETUP_LENGTH`] bytes of `buf`.
pub fn encode_setup(buf: &mut [u8], setup: &Setup) -> EncodeResult<usize> {
    if buf.len() < SETUP_LENGTH {
        return Err(EncodeError::BufferTooSmall);
    }
    if setup.term_length <= 0 {
        return Err(EncodeError::InvalidParameter("non-positive term length"));
    }

    put_prefix(buf, SETUP_LENGTH as i32, 0, HDR_TYPE_SETUP);
    put_i32(buf, TERM_OFFSET_FIELD_OFFSET, setup.term_offset);
    put_i32(buf, SESSION_ID_FIELD_OFFSET, setup.session_id);
    put_i32(buf, STREAM_ID_FIELD_OFFSET, setup.stream_id);
    put_i32(buf, INITIAL_TERM_ID_FIELD_OFFSET, setup.initial_term_id);
    put_i32(buf, ACTIVE_TERM_ID_FIELD_OFFSET, setup.active_term_id);
    put_i32(buf, TERM_LENGTH_FIELD_OFFSET, setup.term_length);
    put_i32(buf, MTU_FIELD_OFFSET, setup.mtu);

    Ok(SETUP_LENGTH)
}

/// Parse a setup frame from a received datagram.
pub fn parse_setup(frame: &[u8]) -> ParseResult<Setup> {
    if frame.len() < SETUP_LENGTH {
        return Err(ParseError::TooShort {
            length: frame.len(),
            required: SETUP_LENGTH,
        });
    }

    Ok(Setup {
        term_offset: get_i32(frame, TERM_OFFSET_FIELD_OFFSET),
        session_id: get_i32(frame, SESSION_ID_FIELD_OFFSET),
        stream_id: get_i32(frame, STREAM_ID_FIELD_OFFSET),
        initial_term_id: get_i32(frame, INITIAL_TERM_ID_FIELD_OFFSET),
        active_term_id: get_i32(frame, ACTIVE_TERM_ID_FIELD_OFFSET),
        term_length: get_i32(frame, TERM_LENGTH_FIELD_OFFSET),
        mtu: get_i32(frame, MTU_FIELD_OFFSET),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let setup = Setup {
            term_offset: 0,
            session_id: 11,
            stream_id: 1001,
            initial_term_id: 7,
            active_term_id: 9,
            term_length: 64 * 1024,
            mtu: 4096,
        };

        let mut buf = [0u8; SETUP_LENGTH];
        encode_setup(&mut buf, &setup).expect("fits");
        assert_eq!(parse_setup(&buf).expect("valid"), setup);
    }

    #[test]
    fn test_golden_bytes() {
        let mut buf = [0u8; SETUP_LENGTH];
        encode_setup(
            &mut buf,
            &Setup {
                term_offset: 1,
                session_id: 2,
                stream_id: 3,
                initial_term_id: 4,
                active_term_id: 5,
                term_length: 65536,
                mtu: 4096,
            },
        )
        .expect("fits");

        assert_eq!(&buf[0..4], &[0x24, 0x00, 0x00, 0x00]); // frame length 36
        assert_eq!(&buf[6..8], &[0x05, 0x00]); // type SETUP
        assert_eq!(&buf[28..32], &[0x00, 0x00, 0x01, 0x00]); // term length 65536
        assert_eq!(&buf[32..36], &[0x00, 0x10, 0x00, 0x00]); // mtu 4096
    }

    #[test]
    fn test_rejects_bad_term_length() {
        let mut buf = [0u8; SETUP_LENGTH];
        let result = encode_setup(
            &mut buf,
            &Setup {
                term_offset: 0,
                session_id: 0,
                stream_id: 0,
                initial_term_id: 0,
                active_term_id: 0,
                term_length: 0,
                mtu: 4096,
            },
        );

        assert_eq!(
            result,
            Err(EncodeError::InvalidParameter("non-positive term length"))
        );
    }
}
