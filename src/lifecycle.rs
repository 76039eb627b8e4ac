use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::penalty::PenaltyConfig;
use crate::records::DueSchedule;
use crate::schedule::ScheduleGenerator;
use crate::store::LedgerStore;
use crate::types::{DueLifecycle, DueRecordId, PolicyId, PolicyStatus};

/// result of cancelling a policy
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationResult {
    pub policy_id: PolicyId,
    pub refunded_due_record_id: DueRecordId,
    pub refund_amount: Money,
    pub cancelled_installments: u32,
}

/// drives activation, cancellation, voiding, expiry and the housekeeping
/// operations on policies and their due records
///
/// Voided and cancelled are terminal; expiry is observed from the stored
/// expiry date rather than kept as a status of its own.
pub struct LifecycleEngine {
    /// policy term in months; expiry = inception + term
    term_months: u32,
    /// used to rebase unpaid penalties when a due amount is amended
    penalty: PenaltyConfig,
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self {
            term_months: 12,
            penalty: PenaltyConfig::default(),
        }
    }

    pub fn with_config(term_months: u32, penalty: PenaltyConfig) -> Self {
        Self {
            term_months,
            penalty,
        }
    }

    /// activate a policy: set inception and expiry, generate the schedule
    ///
    /// Inactive -> Active. Fails on active, voided, cancelled or expired
    /// policies. Schedule generation and the status write land in one
    /// transaction.
    pub fn activate<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<DueSchedule> {
        let now = time.now();
        let today = now.date_naive();

        let (schedule, expiry) = store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            if policy.status.is_terminal() || policy.is_active || policy.is_expired(today) {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "activate".to_string(),
                });
            }

            let expiry = add_months(today, self.term_months)?;
            policy.inception_date = Some(today);
            policy.expiry_date = Some(expiry);
            policy.is_active = true;

            let schedule = ScheduleGenerator::generate(&policy, today)?;
            s.insert_due_records(schedule.records())?;
            s.update_policy(&policy)?;

            Ok((schedule, expiry))
        })?;

        events.emit(Event::PolicyActivated {
            policy_id,
            inception_date: today,
            expiry_date: expiry,
            timestamp: now,
        });
        if let Some(first) = schedule.first() {
            events.emit(Event::ScheduleGenerated {
                policy_id,
                installments: schedule.len() as u32,
                total_amount: schedule.iter().map(|r| r.base_amount).sum(),
                first_due_date: first.due_date,
                timestamp: now,
            });
        }

        Ok(schedule)
    }

    /// cancel a policy: refund the first period, cancel the rest
    ///
    /// Generates the schedule first when none exists, so cancellation
    /// always has a concrete first period to refund. Terminal.
    pub fn cancel<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        reason: &str,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<CancellationResult> {
        if reason.trim().is_empty() {
            return Err(LedgerError::InvalidInput {
                message: "cancellation reason must not be empty".to_string(),
            });
        }

        let now = time.now();
        let today = now.date_naive();

        let result = store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            if policy.status.is_terminal() || policy.is_expired(today) {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "cancel".to_string(),
                });
            }

            let mut schedule = s.due_records(policy_id)?;
            if schedule.is_empty() {
                // activation was skipped; generate so a first period exists
                let anchor = policy.inception_date.unwrap_or(today);
                schedule = ScheduleGenerator::generate(&policy, anchor)?;
                s.insert_due_records(schedule.records())?;
            }

            let mut records = schedule.into_vec();
            let mut first = records.remove(0);
            first.mark_refunded(reason, now);
            let refund_amount = first.refund_amount.unwrap_or(Money::ZERO);
            let refunded_id = first.id;
            s.update_due_record(&first)?;

            let mut cancelled = 0;
            for mut record in records {
                record.lifecycle = DueLifecycle::Cancelled;
                s.update_due_record(&record)?;
                cancelled += 1;
            }

            policy.status = PolicyStatus::Cancelled;
            policy.is_active = false;
            policy.cancellation_reason = Some(reason.to_string());
            policy.cancellation_date = Some(now);
            s.update_policy(&policy)?;

            Ok(CancellationResult {
                policy_id,
                refunded_due_record_id: refunded_id,
                refund_amount,
                cancelled_installments: cancelled,
            })
        })?;

        events.emit(Event::DueRecordRefunded {
            due_record_id: result.refunded_due_record_id,
            policy_id,
            refund_amount: result.refund_amount,
            timestamp: now,
        });
        events.emit(Event::PolicyCancelled {
            policy_id,
            reason: reason.to_string(),
            refunded_amount: result.refund_amount,
            cancelled_installments: result.cancelled_installments,
            timestamp: now,
        });

        Ok(result)
    }

    /// manually void a policy; requires a non-empty reason, terminal
    pub fn void<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        reason: &str,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(LedgerError::InvalidInput {
                message: "void reason must not be empty".to_string(),
            });
        }

        self.apply_void(store, policy_id, reason, false, true, time, events)
    }

    /// automatic void after the batch penalty pass flags a policy
    pub fn void_automatic<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        days_overdue: u32,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let reason = format!("premium installment {} days overdue", days_overdue);
        self.apply_void(store, policy_id, &reason, true, false, time, events)
    }

    fn apply_void<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        reason: &str,
        automatic: bool,
        check_expiry: bool,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let now = time.now();
        let today = now.date_naive();

        store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            if policy.status.is_terminal() || (check_expiry && policy.is_expired(today)) {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "void".to_string(),
                });
            }

            policy.status = PolicyStatus::Voided;
            policy.is_active = false;
            policy.void_reason = Some(reason.to_string());
            policy.voided_date = Some(now);
            s.update_policy(&policy)
        })?;

        events.emit(Event::PolicyVoided {
            policy_id,
            reason: reason.to_string(),
            automatic,
            timestamp: now,
        });

        Ok(())
    }

    /// persist `is_active = false` the first time an expired policy is seen
    ///
    /// Returns true when the deactivation was persisted by this call.
    pub fn deactivate_if_expired<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<bool> {
        let now = time.now();
        let today = now.date_naive();

        let policy = store.policy(policy_id)?;
        let expiry = match policy.expiry_date {
            Some(expiry) if expiry < today && policy.is_active => expiry,
            _ => return Ok(false),
        };

        store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            policy.is_active = false;
            s.update_policy(&policy)
        })?;

        events.emit(Event::PolicyDeactivated {
            policy_id,
            expiry_date: expiry,
            timestamp: now,
        });

        Ok(true)
    }

    /// archive a policy; only permitted while it is not active
    pub fn archive_policy<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let today = time.now().date_naive();

        store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            if policy.is_active {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "archive".to_string(),
                });
            }
            policy.archived = true;
            s.update_policy(&policy)
        })?;

        events.emit(Event::PolicyArchived {
            policy_id,
            timestamp: time.now(),
        });
        Ok(())
    }

    pub fn unarchive_policy<S: LedgerStore>(
        &self,
        store: &mut S,
        policy_id: PolicyId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        store.transaction(|s| {
            let mut policy = s.policy(policy_id)?;
            policy.archived = false;
            s.update_policy(&policy)
        })?;

        events.emit(Event::PolicyUnarchived {
            policy_id,
            timestamp: time.now(),
        });
        Ok(())
    }

    /// archive or unarchive a due record; housekeeping only
    pub fn set_due_record_archived<S: LedgerStore>(
        &self,
        store: &mut S,
        due_record_id: DueRecordId,
        archived: bool,
    ) -> Result<()> {
        store.transaction(|s| {
            let mut record = s.due_record(due_record_id)?;
            record.archived = archived;
            s.update_due_record(&record)
        })
    }

    /// amend a due record's base amount and rebase its unpaid penalties
    pub fn amend_due_amount<S: LedgerStore>(
        &self,
        store: &mut S,
        due_record_id: DueRecordId,
        new_amount: Money,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u32> {
        if !new_amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: new_amount });
        }

        let (old_amount, rebased) = store.transaction(|s| {
            let mut record = s.due_record(due_record_id)?;
            if !record.lifecycle.is_normal() {
                return Err(LedgerError::IrreversibleActionBlocked {
                    message: "cannot amend a cancelled or refunded due record".to_string(),
                });
            }
            if new_amount < record.paid_amount {
                return Err(LedgerError::InvalidInput {
                    message: format!(
                        "amended amount {} is below the amount already paid {}",
                        new_amount, record.paid_amount
                    ),
                });
            }

            let old_amount = record.base_amount;
            record.base_amount = new_amount;
            s.update_due_record(&record)?;

            let mut rebased = 0;
            for mut penalty in s.penalties(due_record_id)? {
                if penalty.is_paid {
                    continue;
                }
                let percent = (penalty.overdue_days * self.penalty.daily_rate_percent)
                    .min(self.penalty.cap_percent);
                penalty.amount = new_amount.percentage(Decimal::from(percent));
                s.update_penalty(&penalty)?;
                rebased += 1;
            }

            Ok((old_amount, rebased))
        })?;

        events.emit(Event::DueAmountAmended {
            due_record_id,
            old_amount,
            new_amount,
            penalties_rebased: rebased,
            timestamp: time.now(),
        });

        Ok(rebased)
    }

    /// delete a due record; blocked once any money has moved against it
    pub fn delete_due_record<S: LedgerStore>(
        &self,
        store: &mut S,
        due_record_id: DueRecordId,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let policy_id = store.transaction(|s| {
            let record = s.due_record(due_record_id)?;
            if !record.paid_amount.is_zero() {
                return Err(LedgerError::IrreversibleActionBlocked {
                    message: "due record has payments recorded against it".to_string(),
                });
            }
            if !s.penalties(due_record_id)?.is_empty() {
                return Err(LedgerError::IrreversibleActionBlocked {
                    message: "due record has penalties attached".to_string(),
                });
            }
            s.delete_due_record(due_record_id)?;
            Ok(record.policy_id)
        })?;

        events.emit(Event::DueRecordDeleted {
            due_record_id,
            policy_id,
            timestamp: time.now(),
        });
        Ok(())
    }
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::Calculation {
            message: format!("date overflow adding {} months to {}", months, date),
        })
}
