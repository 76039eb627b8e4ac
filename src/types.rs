use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a policy
pub type PolicyId = Uuid;

/// unique identifier for a scheduled installment
pub type DueRecordId = Uuid;

/// unique identifier for a penalty record
pub type PenaltyId = Uuid;

/// kind of installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InstallmentKind {
    /// ordinary scheduled installment
    #[default]
    Standard,
    /// backed by a deferred payment instrument (e.g. post-dated cheque);
    /// exempt from overdue penalties
    DeferredInstrument,
}

impl InstallmentKind {
    pub fn is_penalty_exempt(&self) -> bool {
        matches!(self, InstallmentKind::DeferredInstrument)
    }
}

/// lifecycle status of a due record, orthogonal to the archived flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DueLifecycle {
    #[default]
    Normal,
    Cancelled,
    Refunded,
}

impl DueLifecycle {
    pub fn is_normal(&self) -> bool {
        matches!(self, DueLifecycle::Normal)
    }
}

/// terminal policy status; `None` until voided or cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PolicyStatus {
    #[default]
    None,
    Voided,
    Cancelled,
}

impl PolicyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PolicyStatus::None)
    }
}

/// channel a payment was received through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentChannel {
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

/// derived classification of a due record as of a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueClassification {
    /// not yet due, nothing outstanding overdue
    Upcoming,
    /// past due date and not fully settled
    Overdue,
    /// partially paid, not yet due
    PartiallyPaid,
    /// base and all penalties settled
    Paid,
    Cancelled,
    Refunded,
}

/// how one payment was split across a single due record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PaymentBreakdown {
    pub due_record_id: DueRecordId,
    pub installment_no: u32,
    pub to_penalties: Money,
    pub to_principal: Money,
}

impl PaymentBreakdown {
    pub fn total_applied(&self) -> Money {
        self.to_penalties + self.to_principal
    }
}
