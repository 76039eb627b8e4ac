use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::records::{DueRecord, PenaltyRecord};
use crate::store::LedgerStore;
use crate::types::{DueClassification, DueLifecycle, PolicyId};

/// total billed against a due record: base plus every penalty raised
pub fn total_due(due: &DueRecord, penalties: &[PenaltyRecord]) -> Money {
    let penalty_total: Money = penalties.iter().map(|p| p.amount).sum();
    due.base_amount + penalty_total
}

/// total settled against a due record: paid base plus settled penalties
pub fn total_paid(due: &DueRecord, penalties: &[PenaltyRecord]) -> Money {
    let settled: Money = penalties.iter().filter(|p| p.is_paid).map(|p| p.amount).sum();
    due.paid_amount + settled
}

/// what is still owed on a due record
pub fn remaining_balance(due: &DueRecord, penalties: &[PenaltyRecord]) -> Money {
    due.outstanding_with(penalties)
}

/// classify a due record as of the given day
pub fn classify(due: &DueRecord, penalties: &[PenaltyRecord], today: NaiveDate) -> DueClassification {
    match due.lifecycle {
        DueLifecycle::Refunded => return DueClassification::Refunded,
        DueLifecycle::Cancelled => return DueClassification::Cancelled,
        DueLifecycle::Normal => {}
    }

    if remaining_balance(due, penalties).is_zero() {
        return DueClassification::Paid;
    }
    if due.due_date < today {
        return DueClassification::Overdue;
    }
    if due.paid_amount.is_positive() {
        return DueClassification::PartiallyPaid;
    }
    DueClassification::Upcoming
}

/// roll-up of one policy's installment ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAccountSummary {
    pub policy_id: PolicyId,
    pub installments: u32,
    pub installments_paid: u32,
    pub overdue_installments: u32,
    pub total_due: Money,
    pub total_paid: Money,
    pub remaining_balance: Money,
    pub unpaid_penalties: Money,
    pub next_due_date: Option<NaiveDate>,
}

/// build the account summary for a policy as of the given day
///
/// Cancelled and refunded records stay visible in the installment count
/// but contribute nothing to the balances.
pub fn account_summary<S: LedgerStore>(
    store: &S,
    policy_id: PolicyId,
    today: NaiveDate,
) -> Result<PolicyAccountSummary> {
    // resolves the policy first so a missing id surfaces as PolicyNotFound
    let policy = store.policy(policy_id)?;
    let schedule = store.due_records(policy.id)?;

    let mut summary = PolicyAccountSummary {
        policy_id,
        installments: schedule.len() as u32,
        installments_paid: 0,
        overdue_installments: 0,
        total_due: Money::ZERO,
        total_paid: Money::ZERO,
        remaining_balance: Money::ZERO,
        unpaid_penalties: Money::ZERO,
        next_due_date: None,
    };

    for record in &schedule {
        if !record.lifecycle.is_normal() {
            continue;
        }
        let penalties = store.penalties(record.id)?;

        summary.total_due += total_due(record, &penalties);
        summary.total_paid += total_paid(record, &penalties);
        summary.remaining_balance += remaining_balance(record, &penalties);
        let unpaid: Money = penalties
            .iter()
            .filter(|p| !p.is_paid)
            .map(|p| p.amount)
            .sum();
        summary.unpaid_penalties += unpaid;

        match classify(record, &penalties, today) {
            DueClassification::Paid => summary.installments_paid += 1,
            DueClassification::Overdue => summary.overdue_installments += 1,
            _ => {}
        }

        if summary.next_due_date.is_none() && !record.is_fully_paid() && record.due_date >= today {
            summary.next_due_date = Some(record.due_date);
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Policy;
    use crate::store::MemoryStore;
    use crate::types::InstallmentKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due(due_date: NaiveDate) -> DueRecord {
        DueRecord::new(Uuid::new_v4(), 1, due_date, Money::from_major(1_000), InstallmentKind::Standard)
    }

    fn penalty(due_id: Uuid, amount: i64, paid: bool) -> PenaltyRecord {
        let mut p = PenaltyRecord::new(due_id, date(2024, 2, 11), Money::from_major(amount), 10, "10 days overdue, 10% penalty");
        p.is_paid = paid;
        p
    }

    #[test]
    fn test_totals_split_paid_and_unpaid_penalties() {
        let mut record = due(date(2024, 2, 1));
        record.paid_amount = Money::from_major(400);
        let penalties = vec![penalty(record.id, 40, true), penalty(record.id, 100, false)];

        assert_eq!(total_due(&record, &penalties), Money::from_major(1_140));
        assert_eq!(total_paid(&record, &penalties), Money::from_major(440));
        assert_eq!(remaining_balance(&record, &penalties), Money::from_major(700));
    }

    #[test]
    fn test_classification_precedence() {
        let today = date(2024, 3, 1);

        let mut refunded = due(date(2024, 2, 1));
        refunded.lifecycle = DueLifecycle::Refunded;
        assert_eq!(classify(&refunded, &[], today), DueClassification::Refunded);

        let mut cancelled = due(date(2024, 2, 1));
        cancelled.lifecycle = DueLifecycle::Cancelled;
        assert_eq!(classify(&cancelled, &[], today), DueClassification::Cancelled);

        let mut paid = due(date(2024, 2, 1));
        paid.paid_amount = paid.base_amount;
        assert_eq!(classify(&paid, &[], today), DueClassification::Paid);

        // fully paid base with an unpaid penalty is still overdue
        let paid_base = {
            let mut r = due(date(2024, 2, 1));
            r.paid_amount = r.base_amount;
            r
        };
        let pens = vec![penalty(paid_base.id, 100, false)];
        assert_eq!(classify(&paid_base, &pens, today), DueClassification::Overdue);

        let overdue = due(date(2024, 2, 1));
        assert_eq!(classify(&overdue, &[], today), DueClassification::Overdue);

        let mut partial = due(date(2024, 4, 1));
        partial.paid_amount = Money::from_major(300);
        assert_eq!(classify(&partial, &[], today), DueClassification::PartiallyPaid);

        let upcoming = due(date(2024, 4, 1));
        assert_eq!(classify(&upcoming, &[], today), DueClassification::Upcoming);
    }

    #[test]
    fn test_account_summary_rolls_up_schedule() {
        let mut store = MemoryStore::new();
        let policy = Policy::new("POL-1", "H-1", Money::from_major(3_000), 3);
        store.insert_policy(policy.clone()).unwrap();

        let mut r1 = due(date(2024, 2, 1));
        r1.policy_id = policy.id;
        r1.paid_amount = r1.base_amount;
        let mut r2 = due(date(2024, 3, 1));
        r2.policy_id = policy.id;
        r2.installment_no = 2;
        let mut r3 = due(date(2024, 4, 1));
        r3.policy_id = policy.id;
        r3.installment_no = 3;
        store.insert_due_records(&[r1.clone(), r2.clone(), r3.clone()]).unwrap();
        store.insert_penalty(&penalty(r2.id, 100, false)).unwrap();

        let summary = account_summary(&store, policy.id, date(2024, 3, 15)).unwrap();

        assert_eq!(summary.installments, 3);
        assert_eq!(summary.installments_paid, 1);
        assert_eq!(summary.overdue_installments, 1);
        assert_eq!(summary.total_due, Money::from_major(3_100));
        assert_eq!(summary.total_paid, Money::from_major(1_000));
        assert_eq!(summary.remaining_balance, Money::from_major(2_100));
        assert_eq!(summary.unpaid_penalties, Money::from_major(100));
        assert_eq!(summary.next_due_date, Some(date(2024, 4, 1)));
    }

    #[test]
    fn test_account_summary_ignores_cancelled_periods() {
        let mut store = MemoryStore::new();
        let policy = Policy::new("POL-2", "H-2", Money::from_major(2_000), 2);
        store.insert_policy(policy.clone()).unwrap();

        let mut refunded = due(date(2024, 2, 1));
        refunded.policy_id = policy.id;
        refunded.lifecycle = DueLifecycle::Refunded;
        let mut cancelled = due(date(2024, 3, 1));
        cancelled.policy_id = policy.id;
        cancelled.installment_no = 2;
        cancelled.lifecycle = DueLifecycle::Cancelled;
        store.insert_due_records(&[refunded, cancelled]).unwrap();

        let summary = account_summary(&store, policy.id, date(2024, 3, 15)).unwrap();
        assert_eq!(summary.installments, 2);
        assert_eq!(summary.total_due, Money::ZERO);
        assert_eq!(summary.remaining_balance, Money::ZERO);
        assert_eq!(summary.next_due_date, None);
    }
}
