// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Term-buffer trio backing one stream

use std::sync::atomic::{AtomicBool, Ordering};

use super::log_descriptor::{check_term_length, LogError, PARTITION_COUNT};
use super::AtomicBuffer;

/// The rotating log for one publication image: three equally sized
/// power-of-two term buffers carved from a single allocation.
///
/// The allocation is zeroed at creation, which is what lets readers
/// distinguish a valid frame (non-zero header word) from unwritten space.
/// `close` releases the log exactly once; the owning image calls it when the
/// conductor reaps the image.
pub struct RawLog {
    terms: [AtomicBuffer; PARTITION_COUNT],
    term_length: usize,
    closed: AtomicBool,
}

impl RawLog {
    /// Allocate a log of three `term_length` buffers.
    pub fn allocate(term_length: usize) -> Result<Self, LogError> {
        check_term_length(term_length)?;

        let backing = AtomicBuffer::allocate(term_length * PARTITION_COUNT);
        let terms = [
            backing.view(0, term_length),
            backing.view(term_length, term_length),
            backing.view(term_length * 2, term_length),
        ];

        Ok(Self {
            terms,
            term_length,
            closed: AtomicBool::new(false),
        })
    }

    /// The three term buffers in ring order.
    #[must_use]
    #[inline]
    pub fn term_buffers(&self) -> &[AtomicBuffer; PARTITION_COUNT] {
        &self.terms
    }

    /// Length of each term buffer in bytes.
    #[must_use]
    #[inline]
    pub fn term_length(&self) -> usize {
        self.term_length
    }

    /// Release the log. Idempotent; later calls are ignored.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            log::warn!("raw log close called more than once");
        }
    }

    /// Whether the log has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for RawLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawLog")
            .field("term_length", &self.term_length)
            .field("closed", &self.is_closed())
            .finish()
    }
}
