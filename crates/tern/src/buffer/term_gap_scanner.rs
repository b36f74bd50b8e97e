// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Gap detection within a single term
//!
//! Walks the frames of a term from the rebuild point and reports the first
//! unfilled range. Frame-length words are read with acquire semantics so a
//! positive length implies the whole frame is visible (see the rebuilder's
//! release publish).

use crate::protocol::{align_frame_length, data::HEADER_LENGTH, FRAME_ALIGNMENT};

use super::AtomicBuffer;

/// Header length rounded up to frame alignment; the minimum footprint any
/// frame (and therefore any gap) occupies in a term.
pub(crate) const ALIGNED_HEADER_LENGTH: usize =
    (HEADER_LENGTH + FRAME_ALIGNMENT - 1) & !(FRAME_ALIGNMENT - 1);

/// Scan `[term_offset, limit_offset)` for the first gap.
///
/// Returns the offset where contiguous frames end. When that offset is short
/// of `limit_offset` a gap exists and `on_gap(term_id, gap_offset,
/// gap_length)` is invoked once with its extent. The gap ends at the next
/// frame already present in the term, or at the limit.
pub fn scan_for_gap<F>(
    term_buffer: &AtomicBuffer,
    term_id: i32,
    mut term_offset: usize,
    limit_offset: usize,
    mut on_gap: F,
) -> usize
where
    F: FnMut(i32, i32, i32),
{
    debug_assert!(limit_offset <= term_buffer.capacity());

    while term_offset < limit_offset {
        let frame_length = term_buffer.get_i32_volatile(term_offset);
        if frame_length <= 0 {
            break;
        }

        term_offset += align_frame_length(frame_length as usize);
    }

    let gap_begin_offset = term_offset;
    if gap_begin_offset < limit_offset {
        let limit = limit_offset.saturating_sub(ALIGNED_HEADER_LENGTH);

        while term_offset < limit {
            term_offset += FRAME_ALIGNMENT;
            if term_buffer.get_i32_volatile(term_offset) != 0 {
                term_offset -= FRAME_ALIGNMENT;
                break;
            }
        }

        let gap_length = (term_offset - gap_begin_offset) + ALIGNED_HEADER_LENGTH;
        on_gap(term_id, gap_begin_offset as i32, gap_length as i32);
    }

    gap_begin_offset
}
