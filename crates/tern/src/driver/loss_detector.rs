// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loss detection over the rebuild window
//!
//! Driven by the conductor each tick: scan the term containing the rebuild
//! position for the first gap between the contiguous prefix and the
//! high-water mark. A gap is not reported the moment it is seen; it is
//! *activated*, starting a feedback timer from the delay generator. If the
//! gap is still the frontier when the timer expires the handler is invoked
//! (the image hands the descriptor to the receiver, which sends the NAK) and
//! the timer re-arms for retry. A gap that fills, or a rebuild position that
//! catches the high-water mark, cancels the timer.
//!
//! The scan returns a packed outcome carrying the new rebuild offset within
//! the term and the work count for the tick.

use crate::buffer::{scan_for_gap, AtomicBuffer};

use super::feedback::FeedbackDelayGenerator;

/// Receiver of confirmed-loss reports.
pub trait GapHandler {
    /// A gap older than the feedback delay needs retransmission.
    fn on_loss_detected(&self, term_id: i32, term_offset: i32, length: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Gap {
    term_id: i32,
    term_offset: i32,
    length: i32,
}

impl Gap {
    fn matches(&self, term_id: i32, term_offset: i32) -> bool {
        self.term_id == term_id && self.term_offset == term_offset
    }
}

/// Per-image loss detector. Conductor-thread state.
pub struct LossDetector {
    delay_generator: Box<dyn FeedbackDelayGenerator>,
    active_gap: Gap,
    timer_active: bool,
    deadline_ns: i64,
}

impl LossDetector {
    #[must_use]
    pub fn new(delay_generator: Box<dyn FeedbackDelayGenerator>) -> Self {
        Self {
            delay_generator,
            active_gap: Gap::default(),
            timer_active: false,
            deadline_ns: 0,
        }
    }

    /// Scan for gaps between `rebuild_position` and `hwm_position`.
    ///
    /// `term_buffer` must be the term containing `rebuild_position`. Returns
    /// a packed outcome; extract with [`rebuild_offset`] and [`work_count`].
    #[allow(clippy::too_many_arguments)]
    pub fn scan(
        &mut self,
        term_buffer: &AtomicBuffer,
        rebuild_position: i64,
        hwm_position: i64,
        now_ns: i64,
        term_length_mask: i64,
        position_bits_to_shift: u32,
        initial_term_id: i32,
        handler: &dyn GapHandler,
    ) -> i64 {
        let mut work_count = 0;
        let mut rebuild_offset = (rebuild_position & term_length_mask) as i32;

        if rebuild_position < hwm_position {
            let rebuild_term_count = ((rebuild_position as u64) >> position_bits_to_shift) as i32;
            let hwm_term_count = ((hwm_position as u64) >> position_bits_to_shift) as i32;

            let rebuild_term_id = initial_term_id.wrapping_add(rebuild_term_count);
            let hwm_term_offset = (hwm_position & term_length_mask) as usize;
            let limit_offset = if rebuild_term_count == hwm_term_count {
                hwm_term_offset
            } else {
                term_buffer.capacity()
            };

            let mut scanned_gap: Option<Gap> = None;
            rebuild_offset = scan_for_gap(
                term_buffer,
                rebuild_term_id,
                rebuild_offset as usize,
                limit_offset,
                |term_id, term_offset, length| {
                    scanned_gap = Some(Gap {
                        term_id,
                        term_offset,
                        length,
                    });
                },
            ) as i32;

            if let Some(gap) = scanned_gap {
                if !self.timer_active || !self.active_gap.matches(gap.term_id, gap.term_offset) {
                    self.activate_gap(now_ns, gap, handler);
                    work_count = 1;
                }

                rebuild_offset = gap.term_offset;
            } else if self.timer_active {
                // The outstanding gap filled before its deadline.
                self.timer_active = false;
                self.active_gap = Gap::default();
            }
        } else if self.timer_active {
            // Rebuild caught the high-water mark; nothing outstanding.
            self.timer_active = false;
            self.active_gap = Gap::default();
        }

        work_count += self.check_timer_expiry(now_ns, handler);

        pack(rebuild_offset, work_count)
    }

    fn activate_gap(&mut self, now_ns: i64, gap: Gap, handler: &dyn GapHandler) {
        self.active_gap = gap;
        self.deadline_ns = now_ns + self.delay_generator.generate_delay_ns();
        self.timer_active = true;

        if self.delay_generator.should_feedback_immediately() {
            handler.on_loss_detected(gap.term_id, gap.term_offset, gap.length);
        }
    }

    fn check_timer_expiry(&mut self, now_ns: i64, handler: &dyn GapHandler) -> i32 {
        if self.timer_active && now_ns > self.deadline_ns {
            let gap = self.active_gap;
            log::debug!(
                "loss confirmed: term_id={} term_offset={} length={}",
                gap.term_id,
                gap.term_offset,
                gap.length
            );
            handler.on_loss_detected(gap.term_id, gap.term_offset, gap.length);
            self.deadline_ns = now_ns + self.delay_generator.generate_delay_ns();
            return 1;
        }

        0
    }
}

/// Pack a scan outcome.
#[must_use]
#[inline]
fn pack(rebuild_offset: i32, work_count: i32) -> i64 {
    ((rebuild_offset as i64) << 32) | (work_count as i64 & 0xFFFF_FFFF)
}

/// Rebuild offset within the scanned term from a packed outcome.
#[must_use]
#[inline]
pub fn rebuild_offset(scan_outcome: i64) -> i32 {
    (scan_outcome >> 32) as i32
}

/// Work count from a packed outcome.
#[must_use]
#[inline]
pub fn work_count(scan_outcome: i64) -> i32 {
    scan_outcome as i32
}
