// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Out-of-order frame insertion into a term buffer
//!
//! The receiver copies a network frame into its term at the offset the sender
//! stamped on it. Payload and trailing header words land first with plain
//! stores; the leading header word (frame length plus version/flags/type) is
//! release-stored last, so any reader that observes a non-zero frame length
//! sees the complete frame behind it.

use crate::protocol::data::HEADER_LENGTH;

use super::AtomicBuffer;

/// Insert a complete data frame at `term_offset`.
///
/// Re-insertion of the same frame (a duplicate or overlapping retransmit) is
/// harmless: every write is position-indexed and writes identical bytes.
///
/// # Preconditions
///
/// `packet` holds at least a full header and `term_offset + packet.len()`
/// fits in the term.
pub fn insert(term_buffer: &AtomicBuffer, term_offset: usize, packet: &[u8]) {
    debug_assert!(packet.len() >= HEADER_LENGTH, "packet shorter than header");

    term_buffer.put_bytes(term_offset + HEADER_LENGTH, &packet[HEADER_LENGTH..]);

    let word = |at: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&packet[at..at + 8]);
        i64::from_le_bytes(bytes)
    };
    term_buffer.put_i64(term_offset + 24, word(24));
    term_buffer.put_i64(term_offset + 16, word(16));
    term_buffer.put_i64(term_offset + 8, word(8));

    // Frame-length word last, with release semantics: this is the publish.
    term_buffer.put_i64_ordered(term_offset, word(0));
}
