// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared byte buffers with atomic word access
//!
//! The driver's log terms, position counters, and the client broadcast ring
//! all live in buffers that are read and written concurrently by the
//! receiver, the conductor, and subscriber threads. [`AtomicBuffer`] is the
//! one primitive underneath them: a view over an 8-byte-aligned heap
//! allocation offering plain byte ranges plus volatile (acquire) loads and
//! ordered (release) stores of 32/64-bit words at aligned offsets.
//!
//! Writer discipline is by region, not by lock: a byte range has exactly one
//! writer at a time, and readers observe completed writes through a released
//! word (a frame header, a tail counter, a position slot). The buffer itself
//! enforces bounds and alignment; the single-writer contract is the caller's.

mod log_descriptor;
mod raw_log;
mod term_gap_scanner;
mod term_rebuilder;

pub use log_descriptor::{
    check_term_length, compute_position, compute_term_id_from_position, compute_term_offset,
    index_by_position, position_bits_to_shift, LogError, PARTITION_COUNT, TERM_MAX_LENGTH,
    TERM_MIN_LENGTH,
};
pub use raw_log::RawLog;
pub use term_gap_scanner::scan_for_gap;
pub use term_rebuilder::insert;

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

/// Heap allocation shared by every [`AtomicBuffer`] view carved from it.
///
/// Backed by `u64` words so the base address is always 8-byte aligned.
struct Allocation {
    words: Box<[UnsafeCell<u64>]>,
}

// Concurrent access goes through raw pointers with atomic or
// single-writer-per-region semantics; the cell type only exists to make the
// aliasing legal.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

/// A bounds-checked view over a shared, 8-byte-aligned byte buffer.
///
/// Cloning a view is cheap and shares the underlying allocation; views of
/// disjoint ranges of the same allocation may be used from different threads.
#[derive(Clone)]
pub struct AtomicBuffer {
    alloc: Arc<Allocation>,
    offset: usize,
    capacity: usize,
}

impl AtomicBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes.
    ///
    /// The capacity is rounded up to a whole number of 8-byte words.
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        let words = capacity.div_ceil(8);
        let alloc = Allocation {
            words: (0..words).map(|_| UnsafeCell::new(0)).collect(),
        };

        Self {
            alloc: Arc::new(alloc),
            offset: 0,
            capacity,
        }
    }

    /// Create a sub-view of `[offset, offset + length)`.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside this view or `offset` is not 8-byte
    /// aligned (word accesses in the sub-view must stay aligned).
    #[must_use]
    pub fn view(&self, offset: usize, length: usize) -> Self {
        assert!(offset % 8 == 0, "view offset must be 8-byte aligned");
        assert!(
            offset + length <= self.capacity,
            "view [{}, {}) exceeds capacity {}",
            offset,
            offset + length,
            self.capacity
        );

        Self {
            alloc: Arc::clone(&self.alloc),
            offset: self.offset + offset,
            capacity: length,
        }
    }

    /// Capacity of this view in bytes.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Bounds are always enforced, release builds included: offsets originate
    // from the network.
    #[inline]
    fn ptr(&self, index: usize, len: usize) -> *mut u8 {
        assert!(
            index + len <= self.capacity,
            "access [{}, {}) exceeds capacity {}",
            index,
            index + len,
            self.capacity
        );
        let base = self.alloc.words.as_ptr() as *mut u8;
        unsafe { base.add(self.offset + index) }
    }

    #[inline]
    fn atomic_i32(&self, index: usize) -> &AtomicI32 {
        debug_assert!(index % 4 == 0, "i32 access at {index} is unaligned");
        unsafe { &*(self.ptr(index, 4) as *const AtomicI32) }
    }

    /// Reference to the 64-bit atomic word at `index`.
    ///
    /// Used by counters that need read-modify-write on a slot.
    #[inline]
    pub(crate) fn atomic_i64(&self, index: usize) -> &AtomicI64 {
        debug_assert!(index % 8 == 0, "i64 access at {index} is unaligned");
        unsafe { &*(self.ptr(index, 8) as *const AtomicI64) }
    }

    /// Plain 32-bit load. Single-writer regions only.
    #[must_use]
    #[inline]
    pub fn get_i32(&self, index: usize) -> i32 {
        self.atomic_i32(index).load(Ordering::Relaxed)
    }

    /// Plain 32-bit store. Single-writer regions only.
    #[inline]
    pub fn put_i32(&self, index: usize, value: i32) {
        self.atomic_i32(index).store(value, Ordering::Relaxed);
    }

    /// Volatile (acquire) 32-bit load.
    #[must_use]
    #[inline]
    pub fn get_i32_volatile(&self, index: usize) -> i32 {
        self.atomic_i32(index).load(Ordering::Acquire)
    }

    /// Ordered (release) 32-bit store.
    #[inline]
    pub fn put_i32_ordered(&self, index: usize, value: i32) {
        self.atomic_i32(index).store(value, Ordering::Release);
    }

    /// Plain 64-bit load. Single-writer regions only.
    #[must_use]
    #[inline]
    pub fn get_i64(&self, index: usize) -> i64 {
        self.atomic_i64(index).load(Ordering::Relaxed)
    }

    /// Plain 64-bit store. Single-writer regions only.
    #[inline]
    pub fn put_i64(&self, index: usize, value: i64) {
        self.atomic_i64(index).store(value, Ordering::Relaxed);
    }

    /// Volatile (acquire) 64-bit load.
    #[must_use]
    #[inline]
    pub fn get_i64_volatile(&self, index: usize) -> i64 {
        self.atomic_i64(index).load(Ordering::Acquire)
    }

    /// Ordered (release) 64-bit store.
    #[inline]
    pub fn put_i64_ordered(&self, index: usize, value: i64) {
        self.atomic_i64(index).store(value, Ordering::Release);
    }

    /// Copy `src` into the buffer at `index`. Single-writer regions only.
    #[inline]
    pub fn put_bytes(&self, index: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        let dst = self.ptr(index, src.len());
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len()) };
    }

    /// Copy `dst.len()` bytes out of the buffer starting at `index`.
    #[inline]
    pub fn get_bytes(&self, index: usize, dst: &mut [u8]) {
        if dst.is_empty() {
            return;
        }
        let src = self.ptr(index, dst.len());
        unsafe { std::ptr::copy_nonoverlapping(src, dst.as_mut_ptr(), dst.len()) };
    }

    /// Fill `[index, index + length)` with `value`. Single-writer regions only.
    #[inline]
    pub fn set_memory(&self, index: usize, length: usize, value: u8) {
        if length == 0 {
            return;
        }
        let dst = self.ptr(index, length);
        unsafe { std::ptr::write_bytes(dst, value, length) };
    }
}

impl std::fmt::Debug for AtomicBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBuffer")
            .field("offset", &self.offset)
            .field("capacity", &self.capacity)
            .finish()
    }
}
