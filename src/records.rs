use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    DueLifecycle, DueRecordId, InstallmentKind, PaymentChannel, PenaltyId, PolicyId, PolicyStatus,
};

/// policy aggregate root, attributes relevant to the installment ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub policy_number: String,
    pub holder_id: String,

    // schedule inputs, given at policy creation
    pub total_premium: Money,
    pub installment_count: u32,

    // lifecycle
    pub is_active: bool,
    pub status: PolicyStatus,
    pub inception_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,

    pub void_reason: Option<String>,
    pub voided_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancellation_date: Option<DateTime<Utc>>,

    // housekeeping axis, orthogonal to status
    pub archived: bool,
}

impl Policy {
    pub fn new(
        policy_number: impl Into<String>,
        holder_id: impl Into<String>,
        total_premium: Money,
        installment_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_number: policy_number.into(),
            holder_id: holder_id.into(),
            total_premium,
            installment_count,
            is_active: false,
            status: PolicyStatus::None,
            inception_date: None,
            expiry_date: None,
            void_reason: None,
            voided_date: None,
            cancellation_reason: None,
            cancellation_date: None,
            archived: false,
        }
    }

    /// expiry is observed, not stored as a status
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|e| e < today).unwrap_or(false)
    }

    /// voided and cancelled policies accept no further payments
    pub fn can_accept_payment(&self) -> bool {
        !self.status.is_terminal()
    }

    /// label used in state-transition errors
    pub fn state_label(&self, today: NaiveDate) -> &'static str {
        match self.status {
            PolicyStatus::Voided => "voided",
            PolicyStatus::Cancelled => "cancelled",
            PolicyStatus::None if self.is_expired(today) => "expired",
            PolicyStatus::None if self.is_active => "active",
            PolicyStatus::None => "inactive",
        }
    }
}

/// one scheduled installment of a policy's premium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueRecord {
    pub id: DueRecordId,
    pub policy_id: PolicyId,
    /// 1-indexed position within the schedule
    pub installment_no: u32,
    pub due_date: NaiveDate,
    pub base_amount: Money,
    /// accumulated against base_amount only; penalties are settled on
    /// their own records
    pub paid_amount: Money,
    pub kind: InstallmentKind,

    // set by payment allocation on the targeted record only
    pub channel: Option<PaymentChannel>,
    pub reference: Option<String>,

    pub lifecycle: DueLifecycle,
    pub refund_amount: Option<Money>,
    pub refund_date: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,

    pub archived: bool,
}

impl DueRecord {
    pub fn new(
        policy_id: PolicyId,
        installment_no: u32,
        due_date: NaiveDate,
        base_amount: Money,
        kind: InstallmentKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id,
            installment_no,
            due_date,
            base_amount,
            paid_amount: Money::ZERO,
            kind,
            channel: None,
            reference: None,
            lifecycle: DueLifecycle::Normal,
            refund_amount: None,
            refund_date: None,
            refund_reason: None,
            archived: false,
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.base_amount
    }

    /// unpaid portion of the base amount
    pub fn principal_shortfall(&self) -> Money {
        (self.base_amount - self.paid_amount).max(Money::ZERO)
    }

    /// whole days past due as of the given day, zero when not yet due
    pub fn overdue_days(&self, today: NaiveDate) -> u32 {
        (today - self.due_date).num_days().max(0) as u32
    }

    /// outstanding = base shortfall plus unpaid penalties, floored at zero
    pub fn outstanding_with(&self, penalties: &[PenaltyRecord]) -> Money {
        let unpaid_penalties: Money = penalties
            .iter()
            .filter(|p| !p.is_paid)
            .map(|p| p.amount)
            .sum();
        self.principal_shortfall() + unpaid_penalties
    }

    /// mark refunded at cancellation: full base refunded, paid state reset
    pub fn mark_refunded(&mut self, reason: &str, timestamp: DateTime<Utc>) {
        self.lifecycle = DueLifecycle::Refunded;
        self.refund_amount = Some(self.base_amount);
        self.refund_date = Some(timestamp);
        self.refund_reason = Some(reason.to_string());
        self.paid_amount = Money::ZERO;
        self.channel = None;
        self.reference = None;
    }
}

/// one overdue surcharge attached to a due record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub id: PenaltyId,
    pub due_record_id: DueRecordId,
    /// the day it was assessed; at most one penalty per record per day
    pub penalty_date: NaiveDate,
    pub amount: Money,
    pub overdue_days: u32,
    /// free text encoding the day count and rate
    pub reason: String,
    pub is_paid: bool,
}

impl PenaltyRecord {
    pub fn new(
        due_record_id: DueRecordId,
        penalty_date: NaiveDate,
        amount: Money,
        overdue_days: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            due_record_id,
            penalty_date,
            amount,
            overdue_days,
            reason: reason.into(),
            is_paid: false,
        }
    }
}

/// due records of one policy, held in due-date order
///
/// Ordering is an invariant of the collection, not a convention re-derived
/// at each read site: construction sorts by due date, then installment
/// number, and only order-preserving accessors are exposed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DueSchedule(Vec<DueRecord>);

impl DueSchedule {
    pub fn new(mut records: Vec<DueRecord>) -> Self {
        records.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.installment_no.cmp(&b.installment_no))
        });
        Self(records)
    }

    pub fn records(&self) -> &[DueRecord] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DueRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&DueRecord> {
        self.0.first()
    }

    pub fn position_of(&self, id: DueRecordId) -> Option<usize> {
        self.0.iter().position(|r| r.id == id)
    }

    /// records from the given one onward, in due-date order
    pub fn starting_at(&self, id: DueRecordId) -> &[DueRecord] {
        match self.position_of(id) {
            Some(pos) => &self.0[pos..],
            None => &[],
        }
    }

    pub fn into_vec(self) -> Vec<DueRecord> {
        self.0
    }
}

impl<'a> IntoIterator for &'a DueSchedule {
    type Item = &'a DueRecord;
    type IntoIter = std::slice::Iter<'a, DueRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
