use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{DueRecordId, PaymentBreakdown, PaymentChannel, PolicyId};

/// how one payment landed across the policy's ledger
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub policy_id: PolicyId,
    /// the record the payment was booked against
    pub due_record_id: DueRecordId,
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    /// per-record split, in allocation order
    pub allocations: Vec<PaymentBreakdown>,
    pub penalties_settled: u32,
}

impl PaymentReceipt {
    pub fn total_to_penalties(&self) -> Money {
        self.allocations.iter().map(|a| a.to_penalties).sum()
    }

    pub fn total_to_principal(&self) -> Money {
        self.allocations.iter().map(|a| a.to_principal).sum()
    }

    pub fn total_allocated(&self) -> Money {
        self.total_to_penalties() + self.total_to_principal()
    }
}

/// applies incoming payments against the due schedule
///
/// Allocation runs penalties-before-principal and spills forward across
/// periods in due-date order, starting at the targeted record. Unpaid
/// penalties are settled whole or not at all. The entire application is
/// one transaction: a rejected payment leaves no partial writes.
pub struct PaymentEngine;

impl Default for PaymentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply_payment<S: LedgerStore>(
        &self,
        store: &mut S,
        due_record_id: DueRecordId,
        amount: Money,
        channel: PaymentChannel,
        reference: Option<String>,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<PaymentReceipt> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let now = time.now();
        let today = now.date_naive();

        let receipt = store.transaction(|s| {
            let target = s.due_record(due_record_id)?;
            let policy = s.policy(target.policy_id)?;
            if !policy.can_accept_payment() {
                return Err(LedgerError::InvalidStateTransition {
                    current: policy.state_label(today).to_string(),
                    attempted: "record a payment against".to_string(),
                });
            }

            // load the whole schedule with its penalties up front; the
            // bound check spans every record, not just the targeted tail
            let schedule = s.due_records(policy.id)?;
            let mut ledger = Vec::with_capacity(schedule.len());
            for record in schedule.into_vec() {
                let penalties = s.penalties(record.id)?;
                ledger.push((record, penalties));
            }

            let outstanding: Money = ledger
                .iter()
                .filter(|(r, _)| r.lifecycle.is_normal())
                .map(|(r, p)| r.outstanding_with(p))
                .sum();
            if amount > outstanding {
                return Err(LedgerError::OverPayment {
                    outstanding,
                    requested: amount,
                });
            }

            let start = ledger
                .iter()
                .position(|(r, _)| r.id == due_record_id)
                .ok_or(LedgerError::DueRecordNotFound { id: due_record_id })?;

            let mut pool = amount;
            let mut allocations = Vec::new();
            let mut penalties_settled = 0;

            for (record, penalties) in ledger.iter_mut().skip(start) {
                if !record.lifecycle.is_normal() {
                    continue;
                }

                // penalties first, oldest assessment first, each one
                // consumed whole or left untouched
                let mut to_penalties = Money::ZERO;
                for penalty in penalties.iter_mut().filter(|p| !p.is_paid) {
                    if pool < penalty.amount {
                        break;
                    }
                    penalty.is_paid = true;
                    pool -= penalty.amount;
                    to_penalties += penalty.amount;
                    penalties_settled += 1;
                    s.update_penalty(penalty)?;
                }

                // then the base shortfall
                let to_principal = pool.min(record.principal_shortfall());
                if to_principal.is_positive() {
                    record.paid_amount += to_principal;
                    pool -= to_principal;
                }

                let is_target = record.id == due_record_id;
                if is_target {
                    // channel and reference live on the targeted record
                    // only; spillover periods stay untouched
                    record.channel = Some(channel);
                    record.reference = reference.clone();
                }
                if is_target || to_principal.is_positive() {
                    s.update_due_record(record)?;
                }

                if to_penalties.is_positive() || to_principal.is_positive() {
                    allocations.push(PaymentBreakdown {
                        due_record_id: record.id,
                        installment_no: record.installment_no,
                        to_penalties,
                        to_principal,
                    });
                }

                if pool.is_zero() {
                    break;
                }
            }

            // money conservation: every cent of the payment must land
            if pool.is_positive() {
                return Err(LedgerError::UnallocatedFunds { remaining: pool });
            }

            Ok(PaymentReceipt {
                policy_id: policy.id,
                due_record_id,
                amount,
                payment_date: now,
                allocations,
                penalties_settled,
            })
        })?;

        events.emit(Event::PaymentReceived {
            policy_id: receipt.policy_id,
            due_record_id,
            amount,
            applied_to_penalties: receipt.total_to_penalties(),
            applied_to_principal: receipt.total_to_principal(),
            records_touched: receipt.allocations.len() as u32,
            timestamp: now,
        });

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventStore;
    use crate::penalty::PenaltyAssessor;
    use crate::records::{DueRecord, PenaltyRecord, Policy};
    use crate::store::MemoryStore;
    use crate::types::InstallmentKind;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
        ))
    }

    /// active policy with three 1000.00 installments due Feb/Mar/Apr 1st
    fn seed(store: &mut MemoryStore) -> (Policy, Vec<DueRecord>) {
        let mut policy = Policy::new("POL-1", "H-1", Money::from_major(3_000), 3);
        policy.is_active = true;
        policy.inception_date = Some(date(2024, 1, 1));
        policy.expiry_date = Some(date(2025, 1, 1));
        store.insert_policy(policy.clone()).unwrap();

        let records: Vec<DueRecord> = (1..=3u32)
            .map(|i| {
                DueRecord::new(
                    policy.id,
                    i,
                    date(2024, 1 + i, 1),
                    Money::from_major(1_000),
                    InstallmentKind::Standard,
                )
            })
            .collect();
        store.insert_due_records(&records).unwrap();
        (policy, records)
    }

    #[test]
    fn test_payment_with_penalty_and_spillover() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();

        // first installment 10 days overdue: 10% penalty of 100.00
        let time = clock(2024, 2, 11);
        PenaltyAssessor::new()
            .assess(&mut store, records[0].id, &time, &mut events)
            .unwrap();

        let receipt = PaymentEngine::new()
            .apply_payment(
                &mut store,
                records[0].id,
                Money::from_major(1_300),
                PaymentChannel::BankTransfer,
                Some("TXN-17".to_string()),
                &time,
                &mut events,
            )
            .unwrap();

        // 100 penalty + 1000 base on installment 1, 200 spills to 2
        assert_eq!(receipt.allocations.len(), 2);
        assert_eq!(receipt.allocations[0].to_penalties, Money::from_major(100));
        assert_eq!(receipt.allocations[0].to_principal, Money::from_major(1_000));
        assert_eq!(receipt.allocations[1].to_penalties, Money::ZERO);
        assert_eq!(receipt.allocations[1].to_principal, Money::from_major(200));
        assert_eq!(receipt.total_allocated(), Money::from_major(1_300));
        assert_eq!(receipt.penalties_settled, 1);

        let first = store.due_record(records[0].id).unwrap();
        assert!(first.is_fully_paid());
        assert_eq!(first.channel, Some(PaymentChannel::BankTransfer));
        assert_eq!(first.reference.as_deref(), Some("TXN-17"));
        assert!(store.penalties(records[0].id).unwrap()[0].is_paid);

        // spillover period carries no channel or reference
        let second = store.due_record(records[1].id).unwrap();
        assert_eq!(second.paid_amount, Money::from_major(200));
        assert!(second.channel.is_none());
        assert!(second.reference.is_none());

        let third = store.due_record(records[2].id).unwrap();
        assert_eq!(third.paid_amount, Money::ZERO);
    }

    #[test]
    fn test_overpayment_rejected_without_side_effects() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();
        let time = clock(2024, 2, 11);

        PenaltyAssessor::new()
            .assess(&mut store, records[0].id, &time, &mut events)
            .unwrap();
        events.clear();

        // outstanding is 3000 base + 100 penalty
        let err = PaymentEngine::new().apply_payment(
            &mut store,
            records[0].id,
            Money::from_str_exact("3100.01").unwrap(),
            PaymentChannel::Cash,
            None,
            &time,
            &mut events,
        );

        match err {
            Err(LedgerError::OverPayment {
                outstanding,
                requested,
            }) => {
                assert_eq!(outstanding, Money::from_major(3_100));
                assert_eq!(requested, Money::from_str_exact("3100.01").unwrap());
            }
            other => panic!("expected OverPayment, got {:?}", other),
        }

        // full rollback: nothing paid, nothing recorded, no events
        for record in &records {
            let loaded = store.due_record(record.id).unwrap();
            assert_eq!(loaded.paid_amount, Money::ZERO);
            assert!(loaded.channel.is_none());
        }
        assert!(!store.penalties(records[0].id).unwrap()[0].is_paid);
        assert!(events.events().is_empty());
    }

    #[test]
    fn test_exact_payoff_settles_everything() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();
        let time = clock(2024, 2, 11);

        PenaltyAssessor::new()
            .assess(&mut store, records[0].id, &time, &mut events)
            .unwrap();

        let receipt = PaymentEngine::new()
            .apply_payment(
                &mut store,
                records[0].id,
                Money::from_major(3_100),
                PaymentChannel::Cash,
                None,
                &time,
                &mut events,
            )
            .unwrap();

        assert_eq!(receipt.total_allocated(), Money::from_major(3_100));
        for record in &records {
            let loaded = store.due_record(record.id).unwrap();
            assert!(loaded.is_fully_paid());
            // paid_amount never exceeds base_amount
            assert!(loaded.paid_amount <= loaded.base_amount);
        }
    }

    #[test]
    fn test_conservation_across_payment_sequence() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();
        let time = clock(2024, 1, 20);
        let engine = PaymentEngine::new();

        let amounts = ["250.00", "1249.99", "500.01"];
        let mut submitted = Money::ZERO;
        let mut allocated = Money::ZERO;
        for amount in amounts {
            let amount = Money::from_str_exact(amount).unwrap();
            let receipt = engine
                .apply_payment(&mut store, records[0].id, amount, PaymentChannel::Card, None, &time, &mut events)
                .unwrap();
            submitted += amount;
            allocated += receipt.total_allocated();
        }

        assert_eq!(allocated, submitted);
        let total_paid: Money = (0..3)
            .map(|i| store.due_record(records[i].id).unwrap().paid_amount)
            .sum();
        assert_eq!(total_paid, submitted);
    }

    #[test]
    fn test_penalty_too_large_for_pool_is_skipped() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();
        let time = clock(2024, 2, 11);

        PenaltyAssessor::new()
            .assess(&mut store, records[0].id, &time, &mut events)
            .unwrap();

        // 50.00 cannot cover the 100.00 penalty; it all goes to the base
        let receipt = PaymentEngine::new()
            .apply_payment(
                &mut store,
                records[0].id,
                Money::from_major(50),
                PaymentChannel::Cash,
                None,
                &time,
                &mut events,
            )
            .unwrap();

        assert_eq!(receipt.allocations[0].to_penalties, Money::ZERO);
        assert_eq!(receipt.allocations[0].to_principal, Money::from_major(50));
        assert!(!store.penalties(records[0].id).unwrap()[0].is_paid);
        assert_eq!(store.due_record(records[0].id).unwrap().paid_amount, Money::from_major(50));
    }

    #[test]
    fn test_unallocatable_remainder_rolls_back() {
        let mut store = MemoryStore::new();
        let mut policy = Policy::new("POL-U", "H-U", Money::from_major(1_000), 1);
        policy.is_active = true;
        store.insert_policy(policy.clone()).unwrap();

        // base fully paid, one unpaid penalty left behind
        let mut due = DueRecord::new(policy.id, 1, date(2024, 2, 1), Money::from_major(1_000), InstallmentKind::Standard);
        due.paid_amount = due.base_amount;
        store.insert_due_records(std::slice::from_ref(&due)).unwrap();
        store
            .insert_penalty(&PenaltyRecord::new(due.id, date(2024, 2, 11), Money::from_major(100), 10, "10 days overdue, 10% penalty"))
            .unwrap();

        let mut events = EventStore::new();
        let err = PaymentEngine::new().apply_payment(
            &mut store,
            due.id,
            Money::from_major(60),
            PaymentChannel::Cash,
            None,
            &clock(2024, 2, 12),
            &mut events,
        );

        assert!(matches!(err, Err(LedgerError::UnallocatedFunds { .. })));
        assert!(!store.penalties(due.id).unwrap()[0].is_paid);
        assert!(store.due_record(due.id).unwrap().channel.is_none());
    }

    #[test]
    fn test_allocation_starts_at_targeted_record() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();

        let receipt = PaymentEngine::new()
            .apply_payment(
                &mut store,
                records[1].id,
                Money::from_major(1_500),
                PaymentChannel::Cheque,
                Some("CHQ-9".to_string()),
                &clock(2024, 1, 20),
                &mut events,
            )
            .unwrap();

        // installment 1 is skipped even though unpaid
        assert_eq!(store.due_record(records[0].id).unwrap().paid_amount, Money::ZERO);
        assert_eq!(store.due_record(records[1].id).unwrap().paid_amount, Money::from_major(1_000));
        assert_eq!(store.due_record(records[2].id).unwrap().paid_amount, Money::from_major(500));
        assert_eq!(receipt.due_record_id, records[1].id);
    }

    #[test]
    fn test_invalid_amount_and_missing_record() {
        let mut store = MemoryStore::new();
        let (_, records) = seed(&mut store);
        let mut events = EventStore::new();
        let time = clock(2024, 1, 20);
        let engine = PaymentEngine::new();

        assert!(matches!(
            engine.apply_payment(&mut store, records[0].id, Money::ZERO, PaymentChannel::Cash, None, &time, &mut events),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            engine.apply_payment(&mut store, records[0].id, Money::from_major(-5), PaymentChannel::Cash, None, &time, &mut events),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            engine.apply_payment(&mut store, uuid::Uuid::new_v4(), Money::from_major(10), PaymentChannel::Cash, None, &time, &mut events),
            Err(LedgerError::DueRecordNotFound { .. })
        ));
    }

    #[test]
    fn test_terminal_policy_rejects_payments() {
        let mut store = MemoryStore::new();
        let (mut policy, records) = seed(&mut store);
        policy.status = crate::types::PolicyStatus::Cancelled;
        policy.is_active = false;
        store.update_policy(&policy).unwrap();

        let mut events = EventStore::new();
        let err = PaymentEngine::new().apply_payment(
            &mut store,
            records[0].id,
            Money::from_major(100),
            PaymentChannel::Cash,
            None,
            &clock(2024, 1, 20),
            &mut events,
        );
        assert!(matches!(err, Err(LedgerError::InvalidStateTransition { .. })));
    }
}
