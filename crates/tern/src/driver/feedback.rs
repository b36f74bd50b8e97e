// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loss feedback delay policy
//!
//! How long a receiver waits between discovering a gap and requesting
//! retransmission. On multicast, delaying and randomizing feedback avoids
//! NAK storms when many receivers observe the same loss; on unicast an
//! immediate request is usually right.

/// Generates the delay before loss feedback is sent, and on retry.
pub trait FeedbackDelayGenerator: Send {
    /// Delay in nanoseconds until the gap should be (re-)reported.
    fn generate_delay_ns(&mut self) -> i64;

    /// Whether feedback for a newly activated gap should also be sent
    /// straight away, before the first delay elapses.
    fn should_feedback_immediately(&self) -> bool {
        false
    }
}

/// Fixed delay, optionally with immediate first feedback.
#[derive(Debug, Clone)]
pub struct StaticDelayGenerator {
    delay_ns: i64,
    immediate_feedback: bool,
}

impl StaticDelayGenerator {
    /// # Panics
    ///
    /// Panics if `delay_ns` is negative.
    #[must_use]
    pub fn new(delay_ns: i64, immediate_feedback: bool) -> Self {
        assert!(delay_ns >= 0, "delay must be non-negative");

        Self {
            delay_ns,
            immediate_feedback,
        }
    }
}

impl FeedbackDelayGenerator for StaticDelayGenerator {
    fn generate_delay_ns(&mut self) -> i64 {
        self.delay_ns
    }

    fn should_feedback_immediately(&self) -> bool {
        self.immediate_feedback
    }
}
