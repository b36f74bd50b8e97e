// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log layout and stream-position arithmetic
//!
//! A log is three equally sized power-of-two term buffers used as a rotating
//! ring. A 64-bit stream position maps onto the log as
//!
//! ```text
//! term count  = position >> log2(term length)
//! term index  = term count mod 3
//! term offset = position & (term length - 1)
//! term id     = initial term id + term count
//! ```
//!
//! Positions are signed to match the wire protocol's signed arithmetic, but
//! are non-negative for the life of a stream.

use std::fmt;

/// Number of term buffers in a log.
pub const PARTITION_COUNT: usize = 3;

/// Minimum length of a single term buffer.
pub const TERM_MIN_LENGTH: usize = 64 * 1024;

/// Maximum length of a single term buffer.
pub const TERM_MAX_LENGTH: usize = 1024 * 1024 * 1024;

/// Validate that a term length is a power of two within the allowed range.
pub fn check_term_length(term_length: usize) -> Result<(), LogError> {
    if term_length < TERM_MIN_LENGTH {
        return Err(LogError::TermLengthTooSmall(term_length));
    }
    if term_length > TERM_MAX_LENGTH {
        return Err(LogError::TermLengthTooLarge(term_length));
    }
    if !term_length.is_power_of_two() {
        return Err(LogError::TermLengthNotPowerOfTwo(term_length));
    }

    Ok(())
}

/// Number of bits to shift when converting between positions and term counts.
#[must_use]
pub fn position_bits_to_shift(term_length: usize) -> u32 {
    term_length.trailing_zeros()
}

/// Compute the stream position for a `(term id, term offset)` pair.
#[must_use]
pub fn compute_position(
    active_term_id: i32,
    term_offset: i32,
    position_bits_to_shift: u32,
    initial_term_id: i32,
) -> i64 {
    let term_count = i64::from(active_term_id.wrapping_sub(initial_term_id));
    (term_count << position_bits_to_shift) + i64::from(term_offset)
}

/// Index of the term buffer containing `position`.
#[must_use]
pub fn index_by_position(position: i64, position_bits_to_shift: u32) -> usize {
    (((position as u64) >> position_bits_to_shift) % PARTITION_COUNT as u64) as usize
}

/// Term id for a stream position.
#[must_use]
pub fn compute_term_id_from_position(
    position: i64,
    position_bits_to_shift: u32,
    initial_term_id: i32,
) -> i32 {
    (((position as u64) >> position_bits_to_shift) as i32).wrapping_add(initial_term_id)
}

/// Offset within a term for a stream position.
#[must_use]
pub fn compute_term_offset(position: i64, term_length_mask: i64) -> i32 {
    (position & term_length_mask) as i32
}

/// Errors raised when validating a log layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// Term length below [`TERM_MIN_LENGTH`].
    TermLengthTooSmall(usize),
    /// Term length above [`TERM_MAX_LENGTH`].
    TermLengthTooLarge(usize),
    /// Term length is not a power of two.
    TermLengthNotPowerOfTwo(usize),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TermLengthTooSmall(len) => {
                write!(f, "term length {len} below minimum {TERM_MIN_LENGTH}")
            }
            Self::TermLengthTooLarge(len) => {
                write!(f, "term length {len} above maximum {TERM_MAX_LENGTH}")
            }
            Self::TermLengthNotPowerOfTwo(len) => {
                write!(f, "term length {len} is not a power of two")
            }
        }
    }
}

impl std::error::Error for LogError {}
