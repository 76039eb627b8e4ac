use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{DueRecordId, PolicyId};

/// all events emitted by the ledger engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    PolicyActivated {
        policy_id: PolicyId,
        inception_date: NaiveDate,
        expiry_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PolicyCancelled {
        policy_id: PolicyId,
        reason: String,
        refunded_amount: Money,
        cancelled_installments: u32,
        timestamp: DateTime<Utc>,
    },
    PolicyVoided {
        policy_id: PolicyId,
        reason: String,
        automatic: bool,
        timestamp: DateTime<Utc>,
    },
    PolicyDeactivated {
        policy_id: PolicyId,
        expiry_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PolicyArchived {
        policy_id: PolicyId,
        timestamp: DateTime<Utc>,
    },
    PolicyUnarchived {
        policy_id: PolicyId,
        timestamp: DateTime<Utc>,
    },

    // schedule events
    ScheduleGenerated {
        policy_id: PolicyId,
        installments: u32,
        total_amount: Money,
        first_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    DueAmountAmended {
        due_record_id: DueRecordId,
        old_amount: Money,
        new_amount: Money,
        penalties_rebased: u32,
        timestamp: DateTime<Utc>,
    },
    DueRecordDeleted {
        due_record_id: DueRecordId,
        policy_id: PolicyId,
        timestamp: DateTime<Utc>,
    },
    DueRecordRefunded {
        due_record_id: DueRecordId,
        policy_id: PolicyId,
        refund_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        policy_id: PolicyId,
        due_record_id: DueRecordId,
        amount: Money,
        applied_to_penalties: Money,
        applied_to_principal: Money,
        records_touched: u32,
        timestamp: DateTime<Utc>,
    },

    // penalty events
    PenaltyAssessed {
        policy_id: PolicyId,
        due_record_id: DueRecordId,
        amount: Money,
        days_overdue: u32,
        rate: Rate,
        penalty_date: NaiveDate,
    },
    PenaltySuperseded {
        due_record_id: DueRecordId,
        removed: u32,
        penalty_date: NaiveDate,
    },
    PolicyVoidFlagged {
        policy_id: PolicyId,
        due_record_id: DueRecordId,
        days_overdue: u32,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
