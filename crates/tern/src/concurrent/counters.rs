// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Counters buffer management
//!
//! All driver counters (system counters, stream positions, subscriber
//! positions) are 64-bit slots at well-known offsets in one shared values
//! buffer, so external tooling can observe them without any protocol.
//! Each slot owns two cachelines: the value in the first word, the rest
//! padding, so independent writers never share a line.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::AtomicBuffer;

/// Bytes reserved per counter slot (two cachelines).
pub const COUNTER_LENGTH: usize = 128;

/// Allocates and frees counter slots in a values buffer.
///
/// Slot allocation happens on the conductor thread only; reads of the values
/// themselves are lock-free from any thread.
pub struct CountersManager {
    values: AtomicBuffer,
    max_counters: usize,
    registry: Mutex<Registry>,
}

struct Registry {
    labels: Vec<Option<String>>,
    free_list: Vec<i32>,
}

impl CountersManager {
    /// Wrap a values buffer. Capacity determines how many counters fit.
    #[must_use]
    pub fn new(values: AtomicBuffer) -> Self {
        let max_counters = values.capacity() / COUNTER_LENGTH;

        Self {
            values,
            max_counters,
            registry: Mutex::new(Registry {
                labels: Vec::new(),
                free_list: Vec::new(),
            }),
        }
    }

    /// Byte offset of a counter's value within the buffer.
    #[must_use]
    #[inline]
    pub fn counter_offset(counter_id: i32) -> usize {
        counter_id as usize * COUNTER_LENGTH
    }

    /// Maximum number of counters the buffer can hold.
    #[must_use]
    pub fn max_counters(&self) -> usize {
        self.max_counters
    }

    /// Allocate a slot, zeroing its value.
    pub fn allocate(&self, label: &str) -> Result<i32, CountersError> {
        let mut registry = self.registry.lock();

        let id = if let Some(id) = registry.free_list.pop() {
            registry.labels[id as usize] = Some(label.to_string());
            id
        } else {
            if registry.labels.len() >= self.max_counters {
                return Err(CountersError::BufferFull(self.max_counters));
            }
            registry.labels.push(Some(label.to_string()));
            (registry.labels.len() - 1) as i32
        };

        self.values.put_i64_ordered(Self::counter_offset(id), 0);

        Ok(id)
    }

    /// Return a slot to the free list. Freeing an unallocated id is logged
    /// and ignored.
    pub fn free(&self, counter_id: i32) {
        let mut guard = self.registry.lock();
        let registry = &mut *guard;

        match registry.labels.get_mut(counter_id as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                registry.free_list.push(counter_id);
            }
            _ => {
                log::warn!("free of unallocated counter id {counter_id}");
            }
        }
    }

    /// Label of an allocated counter.
    #[must_use]
    pub fn label(&self, counter_id: i32) -> Option<String> {
        self.registry
            .lock()
            .labels
            .get(counter_id as usize)
            .and_then(Clone::clone)
    }

    /// Volatile read of a counter's value.
    #[must_use]
    pub fn counter_value(&self, counter_id: i32) -> i64 {
        self.values.get_i64_volatile(Self::counter_offset(counter_id))
    }

    /// The values buffer backing all slots.
    #[must_use]
    pub fn values_buffer(&self) -> &AtomicBuffer {
        &self.values
    }

    /// Allocate a slot and wrap it as an [`AtomicCounter`].
    pub fn new_counter(self: &Arc<Self>, label: &str) -> Result<AtomicCounter, CountersError> {
        let id = self.allocate(label)?;

        Ok(AtomicCounter {
            values: self.values.clone(),
            id,
            offset: Self::counter_offset(id),
            manager: Arc::clone(self),
        })
    }
}

impl fmt::Debug for CountersManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountersManager")
            .field("max_counters", &self.max_counters)
            .finish()
    }
}

/// Handle on one counter slot supporting lock-free increments from any
/// thread.
#[derive(Clone)]
pub struct AtomicCounter {
    values: AtomicBuffer,
    id: i32,
    offset: usize,
    manager: Arc<CountersManager>,
}

impl AtomicCounter {
    /// Identifier of the underlying slot.
    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Increment with ordered semantics.
    #[inline]
    pub fn increment_ordered(&self) {
        self.values.atomic_i64(self.offset).fetch_add(1, Ordering::Release);
    }

    /// Add `amount` with ordered semantics.
    #[inline]
    pub fn add_ordered(&self, amount: i64) {
        self.values
            .atomic_i64(self.offset)
            .fetch_add(amount, Ordering::Release);
    }

    /// Volatile read of the current value.
    #[must_use]
    #[inline]
    pub fn get(&self) -> i64 {
        self.values.get_i64_volatile(self.offset)
    }

    /// Release the slot back to the manager.
    pub fn close(&self) {
        self.manager.free(self.id);
    }
}

impl fmt::Debug for AtomicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCounter")
            .field("id", &self.id)
            .field("value", &self.get())
            .finish()
    }
}

/// Errors from counter allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountersError {
    /// No free slots remain in the values buffer.
    BufferFull(usize),
}

impl fmt::Display for CountersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull(max) => write!(f, "counters buffer full ({max} slots)"),
        }
    }
}

impl std::error::Error for CountersError {}
