use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::records::{DueRecord, DueSchedule, Policy};
use crate::types::InstallmentKind;

/// turns a policy's premium terms into an ordered sequence of due records
pub struct ScheduleGenerator;

impl ScheduleGenerator {
    /// generate the installment schedule for a policy
    ///
    /// Splits the total premium into N equal monthly dues, the first one
    /// month after the activation date. The final installment absorbs the
    /// rounding remainder so the schedule sums to the premium exactly.
    pub fn generate(policy: &Policy, activation_date: NaiveDate) -> Result<DueSchedule> {
        let total = policy.total_premium;
        let count = policy.installment_count;

        if !total.is_positive() {
            return Err(LedgerError::InvalidInput {
                message: format!("total premium must be positive, got {}", total),
            });
        }
        if count < 1 {
            return Err(LedgerError::InvalidInput {
                message: "installment count must be at least 1".to_string(),
            });
        }

        let per_installment = total / Decimal::from(count);
        if !per_installment.is_positive() {
            return Err(LedgerError::InvalidInput {
                message: format!(
                    "premium {} cannot be split into {} installments",
                    total, count
                ),
            });
        }

        let mut records = Vec::with_capacity(count as usize);
        let mut allocated = Money::ZERO;

        for i in 1..=count {
            let due_date = activation_date
                .checked_add_months(Months::new(i))
                .ok_or_else(|| LedgerError::Calculation {
                    message: format!("due date overflow at installment {}", i),
                })?;

            // last installment takes whatever keeps the sum exact
            let amount = if i == count {
                total - allocated
            } else {
                per_installment
            };
            if !amount.is_positive() {
                return Err(LedgerError::InvalidInput {
                    message: format!(
                        "premium {} cannot be split into {} installments",
                        total, count
                    ),
                });
            }
            allocated += amount;

            records.push(DueRecord::new(
                policy.id,
                i,
                due_date,
                amount,
                InstallmentKind::Standard,
            ));
        }

        Ok(DueSchedule::new(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(total: &str, count: u32) -> Policy {
        Policy::new("POL-1", "H-1", Money::from_str_exact(total).unwrap(), count)
    }

    #[test]
    fn test_twelve_equal_installments() {
        let schedule =
            ScheduleGenerator::generate(&policy("12000.00", 12), date(2024, 1, 15)).unwrap();

        assert_eq!(schedule.len(), 12);
        for record in &schedule {
            assert_eq!(record.base_amount, Money::from_major(1_000));
            assert_eq!(record.kind, InstallmentKind::Standard);
            assert_eq!(record.paid_amount, Money::ZERO);
        }

        // first due one month after activation, then monthly
        assert_eq!(schedule.records()[0].due_date, date(2024, 2, 15));
        assert_eq!(schedule.records()[1].due_date, date(2024, 3, 15));
        assert_eq!(schedule.records()[11].due_date, date(2025, 1, 15));
    }

    #[test]
    fn test_remainder_lands_on_final_installment() {
        let schedule =
            ScheduleGenerator::generate(&policy("1000.00", 3), date(2024, 1, 1)).unwrap();

        let amounts: Vec<Money> = schedule.iter().map(|r| r.base_amount).collect();
        assert_eq!(amounts[0], Money::from_str_exact("333.33").unwrap());
        assert_eq!(amounts[1], Money::from_str_exact("333.33").unwrap());
        assert_eq!(amounts[2], Money::from_str_exact("333.34").unwrap());

        let total: Money = schedule.iter().map(|r| r.base_amount).sum();
        assert_eq!(total, Money::from_major(1_000));
    }

    #[test]
    fn test_schedule_sums_exactly_for_awkward_divisions() {
        for (total, count) in [("100.00", 3u32), ("999.99", 7), ("50.05", 6), ("12000.00", 11)] {
            let schedule =
                ScheduleGenerator::generate(&policy(total, count), date(2024, 1, 1)).unwrap();
            let sum: Money = schedule.iter().map(|r| r.base_amount).sum();
            assert_eq!(sum, Money::from_str_exact(total).unwrap(), "{}/{}", total, count);
        }
    }

    #[test]
    fn test_month_end_activation() {
        // Jan 31 + 1 month clamps to Feb 29 in a leap year
        let schedule =
            ScheduleGenerator::generate(&policy("1200.00", 3), date(2024, 1, 31)).unwrap();
        assert_eq!(schedule.records()[0].due_date, date(2024, 2, 29));
        assert_eq!(schedule.records()[1].due_date, date(2024, 3, 31));
    }

    #[test]
    fn test_single_installment() {
        let schedule =
            ScheduleGenerator::generate(&policy("5000.00", 1), date(2024, 6, 1)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.first().unwrap().base_amount, Money::from_major(5_000));
        assert_eq!(schedule.first().unwrap().due_date, date(2024, 7, 1));
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(matches!(
            ScheduleGenerator::generate(&policy("0.00", 12), date(2024, 1, 1)),
            Err(LedgerError::InvalidInput { .. })
        ));
        assert!(matches!(
            ScheduleGenerator::generate(&policy("1000.00", 0), date(2024, 1, 1)),
            Err(LedgerError::InvalidInput { .. })
        ));
        // per-installment amount would round to zero
        assert!(matches!(
            ScheduleGenerator::generate(&policy("0.01", 3), date(2024, 1, 1)),
            Err(LedgerError::InvalidInput { .. })
        ));
    }
}
