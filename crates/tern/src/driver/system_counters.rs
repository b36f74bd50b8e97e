// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Driver-wide system counters
//!
//! Fixed set of counters every image increments. Abnormal packet conditions
//! never raise errors; they land here, observable by external tooling
//! through the counters buffer.

use std::sync::Arc;

use crate::concurrent::{AtomicCounter, CountersError, CountersManager};

/// Identifiers for the system counter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCounterDescriptor {
    /// Heartbeat data frames received.
    HeartbeatsReceived,
    /// Status messages sent to senders.
    StatusMessagesSent,
    /// NAK messages sent to senders.
    NakMessagesSent,
    /// Packets dropped behind the flow-control window.
    FlowControlUnderRuns,
    /// Packets dropped beyond the flow-control window.
    FlowControlOverRuns,
}

impl SystemCounterDescriptor {
    /// Label recorded against the counter slot.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::HeartbeatsReceived => "Heartbeats received",
            Self::StatusMessagesSent => "Status messages sent",
            Self::NakMessagesSent => "NAK messages sent",
            Self::FlowControlUnderRuns => "Flow control under runs",
            Self::FlowControlOverRuns => "Flow control over runs",
        }
    }
}

/// The allocated system counter set.
#[derive(Debug)]
pub struct SystemCounters {
    heartbeats_received: AtomicCounter,
    status_messages_sent: AtomicCounter,
    nak_messages_sent: AtomicCounter,
    flow_control_under_runs: AtomicCounter,
    flow_control_over_runs: AtomicCounter,
}

impl SystemCounters {
    /// Allocate every system counter from `manager`.
    pub fn new(manager: &Arc<CountersManager>) -> Result<Self, CountersError> {
        Ok(Self {
            heartbeats_received: manager
                .new_counter(SystemCounterDescriptor::HeartbeatsReceived.label())?,
            status_messages_sent: manager
                .new_counter(SystemCounterDescriptor::StatusMessagesSent.label())?,
            nak_messages_sent: manager
                .new_counter(SystemCounterDescriptor::NakMessagesSent.label())?,
            flow_control_under_runs: manager
                .new_counter(SystemCounterDescriptor::FlowControlUnderRuns.label())?,
            flow_control_over_runs: manager
                .new_counter(SystemCounterDescriptor::FlowControlOverRuns.label())?,
        })
    }

    /// Counter for a descriptor.
    #[must_use]
    pub fn get(&self, descriptor: SystemCounterDescriptor) -> &AtomicCounter {
        match descriptor {
            SystemCounterDescriptor::HeartbeatsReceived => &self.heartbeats_received,
            SystemCounterDescriptor::StatusMessagesSent => &self.status_messages_sent,
            SystemCounterDescriptor::NakMessagesSent => &self.nak_messages_sent,
            SystemCounterDescriptor::FlowControlUnderRuns => &self.flow_control_under_runs,
            SystemCounterDescriptor::FlowControlOverRuns => &self.flow_control_over_runs,
        }
    }
}
