// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monotonic stream-position counters
//!
//! Positions are 64-bit values in the shared counters buffer. Each has one
//! writer: the receiver owns the high-water mark, the conductor owns the
//! rebuild position, each subscriber owns its consumption position. Readers
//! on other threads use volatile (acquire) loads; writers publish with
//! ordered (release) stores, so a position is never observed ahead of the
//! data it covers.

use std::fmt;
use std::sync::Arc;

use crate::buffer::AtomicBuffer;

use super::counters::{CountersManager, CountersError};

/// Read side of a position counter.
///
/// The trait is the seam between an image and its subscribers: the image
/// folds over `get_volatile` without knowing who advances the counter.
pub trait ReadablePosition: Send + Sync {
    /// Identifier of the underlying counter slot.
    fn id(&self) -> i32;

    /// Volatile (acquire) read of the position.
    fn get_volatile(&self) -> i64;

    /// Release the counter slot. Called once, by the owner, at end of life.
    fn close(&self);
}

/// A position counter slot in the shared values buffer.
///
/// Clones share the slot; exactly one clone may write at a time.
#[derive(Clone)]
pub struct BufferPosition {
    values: AtomicBuffer,
    id: i32,
    offset: usize,
    manager: Arc<CountersManager>,
}

impl BufferPosition {
    /// Allocate a new position counter from `manager`.
    pub fn allocate(manager: &Arc<CountersManager>, label: &str) -> Result<Self, CountersError> {
        let id = manager.allocate(label)?;

        Ok(Self {
            values: manager.values_buffer().clone(),
            id,
            offset: CountersManager::counter_offset(id),
            manager: Arc::clone(manager),
        })
    }

    /// Plain read. Valid only on the writing thread.
    #[must_use]
    #[inline]
    pub fn get(&self) -> i64 {
        self.values.get_i64(self.offset)
    }

    /// Plain store. Valid only on the writing thread, for values that need
    /// no cross-thread publication.
    #[inline]
    pub fn set(&self, value: i64) {
        self.values.put_i64(self.offset, value);
    }

    /// Ordered (release) store.
    #[inline]
    pub fn set_ordered(&self, value: i64) {
        self.values.put_i64_ordered(self.offset, value);
    }

    /// Ordered store of `proposed` iff it exceeds the current value.
    ///
    /// Single-writer: the read-check-store needs no compare-and-swap.
    #[inline]
    pub fn propose_max_ordered(&self, proposed: i64) -> bool {
        if proposed > self.get() {
            self.set_ordered(proposed);
            return true;
        }

        false
    }
}

impl ReadablePosition for BufferPosition {
    fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    fn get_volatile(&self) -> i64 {
        self.values.get_i64_volatile(self.offset)
    }

    fn close(&self) {
        self.manager.free(self.id);
    }
}

impl fmt::Debug for BufferPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPosition")
            .field("id", &self.id)
            .field("value", &self.get_volatile())
            .finish()
    }
}
